#![allow(dead_code)]

pub mod recording_controller;
