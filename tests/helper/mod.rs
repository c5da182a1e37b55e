#![allow(dead_code)]

mod feed;

pub use feed::*;
