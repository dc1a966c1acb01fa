pub mod agent_routes;
pub mod callback_routes;
