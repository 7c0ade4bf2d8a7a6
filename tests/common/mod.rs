#![allow(dead_code)]

pub mod logging;

pub mod storage;

pub mod transport;
