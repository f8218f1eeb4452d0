//! Font registration for chart labels.
//!
//! Chart text is rasterised with `ab_glyph`, which only knows the fonts
//! registered here. Without one, charts are still drawn but lose their text.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use plotters::style::{register_font, FontStyle};
use tracing::{info, warn};

/// Family name used by every chart.
pub const FONT_FAMILY: &str = "sans-serif";

/// Fonts tried, in order, when none is configured.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

static REGISTERED: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Register the chart font once per process.
///
/// Tries `configured` first, then well-known system locations. Returns the
/// font in use, if any. Later calls return the first result.
pub fn init_fonts(configured: Option<&Path>) -> Option<&'static Path> {
    REGISTERED
        .get_or_init(|| {
            let candidates = configured
                .into_iter()
                .map(Path::to_path_buf)
                .chain(SYSTEM_FONTS.iter().map(PathBuf::from));

            for path in candidates {
                if try_register(&path) {
                    info!("Chart font registered from {}", path.display());
                    return Some(path);
                }
            }

            warn!("No chart font found; charts will be drawn without labels");
            None
        })
        .as_deref()
}

fn try_register(path: &Path) -> bool {
    let Ok(bytes) = std::fs::read(path) else {
        return false;
    };

    // Registered fonts must live for the rest of the process
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    match register_font(FONT_FAMILY, FontStyle::Normal, bytes) {
        Ok(()) => true,
        Err(_) => {
            warn!("Ignoring invalid font file {}", path.display());
            false
        }
    }
}
