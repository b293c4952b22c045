pub mod status_models;
