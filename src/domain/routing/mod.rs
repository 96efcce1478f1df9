pub mod dijkstra_route_provider;
pub mod edge_evaluator;
pub mod route_provider;
