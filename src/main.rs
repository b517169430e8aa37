use app::{AppHelper, Command, DecodeCommand, EncodeCommand, PresetsCommand};

mod app;

const AUTHORS: &str = "The popflex developers";

fn main() {
    let app_name = option_env!("CARGO_PKG_NAME").unwrap_or("unknown app name");
    let app_version = option_env!("CARGO_PKG_VERSION").unwrap_or("unknown version");
    let mut app = AppHelper::new(
        app_name,
        app_version,
        AUTHORS,
        "Popflex, a partial-order plan flexibility optimiser.",
    );
    let commands: Vec<Box<dyn Command>> = vec![
        Box::new(EncodeCommand::new()),
        Box::new(DecodeCommand::new()),
        Box::new(PresetsCommand::new()),
    ];
    for c in commands {
        app.add_command(c);
    }
    app.launch_app();
}
