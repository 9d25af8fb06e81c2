//! Bus data formats and their compatibility relation.
//!
//! A [`FormatTag`] names the shape class of the images allowed on a bus or
//! expected by an operator port. Compatibility is directed: a *required*
//! tag accepts an *actual* tag when the actual tag is in the required tag's
//! accepted set.
//!
//! | required    | accepts                          |
//! |-------------|----------------------------------|
//! | `Bgr`       | `Bgr`                            |
//! | `Rgb`       | `Rgb`                            |
//! | `Hsv`       | `Hsv`                            |
//! | `Channel`   | `Channel`                        |
//! | `Triple`    | `Triple`, `Bgr`, `Rgb`, `Hsv`    |
//! | `Universal` | everything                       |
//!
//! # Usage
//!
//! ```rust
//! use ipp_core::FormatTag;
//!
//! assert!(FormatTag::Universal.accepts(FormatTag::Triple));
//! assert!(!FormatTag::Triple.accepts(FormatTag::Universal));
//! assert!(FormatTag::Triple.accepts(FormatTag::Hsv));
//! assert!(!FormatTag::Rgb.accepts(FormatTag::Bgr));
//! ```

use std::fmt;
use std::str::FromStr;

/// Shape class of image data flowing on a bus.
///
/// The colorspace tags are advisory labels: nothing converts between them,
/// they only keep e.g. an HSV producer from being wired into a BGR consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FormatTag {
    /// `[blue, green, red]` per pixel.
    Bgr,
    /// `[red, green, blue]` per pixel.
    Rgb,
    /// `[hue, saturation, value]` per pixel.
    Hsv,
    /// Single channel image.
    Channel,
    /// Any three channel image (BGR, RGB or HSV).
    Triple,
    /// Single or three channel image.
    Universal,
}

impl FormatTag {
    /// Every tag, in declaration order.
    pub const ALL: [FormatTag; 6] = [
        FormatTag::Bgr,
        FormatTag::Rgb,
        FormatTag::Hsv,
        FormatTag::Channel,
        FormatTag::Triple,
        FormatTag::Universal,
    ];

    /// Tags accepted where `self` is required.
    pub const fn accepted(self) -> &'static [FormatTag] {
        match self {
            FormatTag::Bgr => &[FormatTag::Bgr],
            FormatTag::Rgb => &[FormatTag::Rgb],
            FormatTag::Hsv => &[FormatTag::Hsv],
            FormatTag::Channel => &[FormatTag::Channel],
            FormatTag::Triple => &[
                FormatTag::Triple,
                FormatTag::Bgr,
                FormatTag::Rgb,
                FormatTag::Hsv,
            ],
            FormatTag::Universal => &FormatTag::ALL,
        }
    }

    /// Returns `true` if data tagged `actual` may be used where `self` is
    /// required.
    #[inline]
    pub fn accepts(self, actual: FormatTag) -> bool {
        self.accepted().contains(&actual)
    }

    /// Number of channels an image with this tag must carry, or `None` for
    /// `Universal`, which takes single and three channel images alike.
    #[inline]
    pub const fn channel_count(self) -> Option<u32> {
        match self {
            FormatTag::Channel => Some(1),
            FormatTag::Bgr | FormatTag::Rgb | FormatTag::Hsv | FormatTag::Triple => Some(3),
            FormatTag::Universal => None,
        }
    }

    /// Returns `true` if an image with `channels` channels satisfies this tag.
    ///
    /// Only 1 and 3 channel images exist on buses: `Universal` admits both
    /// and nothing else.
    #[inline]
    pub fn admits_channels(self, channels: u32) -> bool {
        match self.channel_count() {
            Some(n) => n == channels,
            None => channels == 1 || channels == 3,
        }
    }

    /// Returns `true` for `Triple` and the three colorspace tags.
    #[inline]
    pub fn is_triple(self) -> bool {
        FormatTag::Triple.accepts(self)
    }

    /// Lowercase name, as used in manifests.
    pub const fn name(self) -> &'static str {
        match self {
            FormatTag::Bgr => "bgr",
            FormatTag::Rgb => "rgb",
            FormatTag::Hsv => "hsv",
            FormatTag::Channel => "channel",
            FormatTag::Triple => "triple",
            FormatTag::Universal => "universal",
        }
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FormatTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormatTag::ALL
            .into_iter()
            .find(|tag| tag.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown format tag: {s}"))
    }
}
