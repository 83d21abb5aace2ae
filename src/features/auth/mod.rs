pub mod handler;
pub mod models;
pub mod password;
pub mod service;
pub mod token;

// 对外导出路由构建函数，便于 app.rs 引用
pub use handler::create_auth_router;
pub use service::UserStore;
pub use token::AuthUser;
