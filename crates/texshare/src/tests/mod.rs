mod support;

mod definition;
mod image;
