mod helpers;
mod ipc;
mod lifecycle;
