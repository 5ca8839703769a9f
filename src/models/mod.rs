pub mod audit;
pub mod courier;
pub mod order;
pub mod route;
pub mod stop;
