// Module messaging - Lock-free channels between input, scheduler, audio and display

pub mod channels;
pub mod command;
pub mod display;
pub mod notification;
