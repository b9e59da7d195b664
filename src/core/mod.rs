pub mod config;
pub mod corpus;
pub mod estimator;
pub mod evaluation;
pub mod model;
pub mod predictor;
pub mod similarity;
