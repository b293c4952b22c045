pub mod status_routes;
