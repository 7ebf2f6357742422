//! Line protocol for the stdin driver.

use dirsim_core::{ControlCommand, SliderReading};
use dirsim_types::{ConfigUpdate, Mode, Zone};

/// One parsed stdin line.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Hand position for this frame, `None` when no hand was seen.
    Position(Option<(f64, f64)>),
    Touch(Zone),
    Fingers(SliderReading),
    Control(ControlCommand),
    Quit,
}

pub const USAGE: &str = "commands: pos X Y | none | touch ZONE | fingers INDEX_Y|- PINKY_Y|- HEIGHT | \
mode motion|pattern|toggle | reset | set KEY VALUE | target HOST PORT | quit";

/// Parse one line. Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Input>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let parts: Vec<&str> = line.split_whitespace().collect();
    let input = match parts.as_slice() {
        ["pos", x, y] => Input::Position(Some((number(x)?, number(y)?))),
        ["none"] => Input::Position(None),
        ["touch", zone] => Input::Touch(zone.parse()?),
        ["fingers", index, pinky, height] => Input::Fingers(SliderReading {
            index_y: optional_number(index)?,
            pinky_y: optional_number(pinky)?,
            frame_height: number(height)?,
        }),
        ["mode", "toggle"] => Input::Control(ControlCommand::ToggleMode),
        ["mode", mode] => Input::Control(ControlCommand::SetMode(mode.parse::<Mode>()?)),
        ["reset"] => Input::Control(ControlCommand::Reset),
        ["set", key, value] => {
            let update = ConfigUpdate::parse(key, number(value)?).map_err(|e| e.to_string())?;
            Input::Control(ControlCommand::UpdateConfig(update))
        }
        ["target", host, port] => Input::Control(ControlCommand::Retarget {
            host: host.to_string(),
            port: port
                .parse()
                .map_err(|_| format!("invalid port '{}'", port))?,
        }),
        ["quit"] | ["exit"] => Input::Quit,
        _ => return Err(format!("unrecognized '{}'; {}", line, USAGE)),
    };
    Ok(Some(input))
}

fn number(s: &str) -> Result<f64, String> {
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("invalid number '{}'", s))
}

fn optional_number(s: &str) -> Result<Option<f64>, String> {
    if s == "-" {
        Ok(None)
    } else {
        number(s).map(Some)
    }
}
