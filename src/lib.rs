pub mod clock;
pub mod cmdline;
pub mod hub;
pub mod ids;
pub mod messages;
pub mod room;
pub mod room_server;
pub mod session;
pub mod util;
pub mod web;
pub mod youtube;
