// Core utilities shared by the input modules

pub mod math;
