pub mod cart_service;
pub mod cart_sessions;
pub mod checkout_flow;
pub mod checkout_service;
pub mod deadline;
pub mod payment;
