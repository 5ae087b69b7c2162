pub mod activity;
pub mod attachment;
pub mod board;
pub mod board_column;
pub mod cascade;
pub mod change_log;
pub mod checklist_item;
pub mod comment;
pub mod label;
pub mod notification;
pub mod project;
pub mod setting;
pub mod task;
pub mod template;
