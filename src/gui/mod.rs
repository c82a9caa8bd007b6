pub mod frontend;
pub mod graph_view;
pub mod property_view;
