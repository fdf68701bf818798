#[allow(non_snake_case)]
pub mod BlackOil;
#[allow(non_snake_case)]
pub mod Numerics;
#[allow(non_snake_case)]
pub mod TimeStepping;
#[allow(non_snake_case)]
pub mod Utils;
#[allow(non_snake_case)]
pub mod Wells;
pub mod simulator;
