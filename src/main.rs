use std::path::PathBuf;

use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};

use sio2conv::{
    conversion,
    formats::sio2::{ExportOptions, Membership},
};

fn main() -> Result<()> {
    env_logger::init();

    let files: Vec<String> = std::env::args().skip(1).collect();
    if files.is_empty() {
        eprintln!("Usage: sio2conv <FILES>...");
        return Ok(());
    }

    let options = prompt_options()?;
    conversion::convert(&files, options)
}

fn prompt_options() -> Result<ExportOptions> {
    let theme = ColorfulTheme::default();

    let destination: String = Input::with_theme(&theme)
        .with_prompt("Destination directory")
        .default(String::from("."))
        .interact_text()?;
    let scene_name: String = Input::with_theme(&theme)
        .with_prompt("Scene name")
        .default(String::from("TempScene"))
        .interact_text()?;
    let frame_rate: u32 = Input::with_theme(&theme)
        .with_prompt("Animation frame rate (0 disables the sampling fallback)")
        .default(0)
        .interact_text()?;
    let playback_start: f64 = Input::with_theme(&theme)
        .with_prompt("Playback start frame")
        .default(0.)
        .interact_text()?;
    let playback_end: f64 = Input::with_theme(&theme)
        .with_prompt("Playback end frame")
        .default(0.)
        .interact_text()?;
    let blend_shapes = Confirm::with_theme(&theme)
        .with_prompt("Export blend shapes?")
        .default(false)
        .interact()?;
    let convert_to_backface_culling = Confirm::with_theme(&theme)
        .with_prompt("Convert winding order for backface culling?")
        .default(false)
        .interact()?;
    let membership = Select::with_theme(&theme)
        .with_prompt("Vertex group membership")
        .items(&["Any corner influenced", "All corners influenced"])
        .default(0)
        .interact()?;
    let membership = if membership == 0 {
        Membership::Any
    } else {
        Membership::All
    };

    Ok(ExportOptions {
        destination: PathBuf::from(destination),
        scene_name,
        frame_rate,
        blend_shapes,
        convert_to_backface_culling,
        membership,
        playback: (playback_start, playback_end),
    })
}
