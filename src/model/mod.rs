pub mod area_path;
pub mod credential;
pub mod work_item;
