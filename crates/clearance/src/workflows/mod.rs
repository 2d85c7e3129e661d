pub mod clearance;
