pub mod fallback;
pub mod model;
pub mod object_name;
pub mod sanitize;
pub mod services;
pub mod site_content;
pub mod validate;
