pub mod bridge;
pub mod gql;
pub mod graph_utils;
pub mod gui;
pub mod persistence;
