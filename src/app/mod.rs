mod app_helper;
pub(crate) use app_helper::AppHelper;

mod cli_manager;

mod command;
pub(crate) use command::Command;

pub(crate) mod common;

mod decode_command;
pub(crate) use decode_command::DecodeCommand;

mod encode_command;
pub(crate) use encode_command::EncodeCommand;

mod presets_command;
pub(crate) use presets_command::PresetsCommand;

mod writable_string;
