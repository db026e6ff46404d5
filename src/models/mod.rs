pub mod factory;
pub mod gam;
pub mod gradient_boosting;
pub mod random_forest;
pub mod regressor;
pub mod tree;
