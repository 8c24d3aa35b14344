pub mod chart_service;
pub mod prediction_service;
pub mod series_service;
pub mod session_service;
pub mod view_service;
