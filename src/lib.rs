pub mod active;
pub mod config;
pub mod error;
pub mod events;
pub mod panel;
pub mod params;
pub mod processing {
    pub mod assets;
    pub mod compositor;
    pub mod layout;
    pub mod noise;
}
pub mod render {
    pub mod headless;
    pub mod viewer;
}
pub mod tasks {
    pub mod loader;
    pub mod unsplash;
    pub mod watch;
}
