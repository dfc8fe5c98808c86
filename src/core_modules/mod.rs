pub mod audio;
pub mod frame_differencer;
pub mod grid_manager;
pub mod note;
pub mod pitch;
pub mod pixel;
pub mod pixel_buffer;
pub mod render;
