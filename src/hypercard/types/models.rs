//! Data structures for the decoded contents of a stack.

use std::fmt;

use super::error::{Result, StackError};
use super::text::MacString;

// --- Format revisions ---

/// The two on-disk layouts. Version 1 blocks are 4 bytes shorter past offset 0x0C.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileVersion {
    V1,
    V2,
}

impl FileVersion {
    /// Rebases a version 2 field offset (0x10 or more) onto this layout.
    pub fn field(&self, v2_offset: usize) -> usize {
        match self {
            FileVersion::V1 => v2_offset - 4,
            FileVersion::V2 => v2_offset,
        }
    }
}

/// The format revision stored in the low byte of the word at 0x10 of the stack block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatRevision {
    PreReleaseV1(u8),
    V1,
    PreReleaseV2,
    V2,
}

impl FormatRevision {
    pub fn version(&self) -> FileVersion {
        match self {
            FormatRevision::PreReleaseV1(_) | FormatRevision::V1 => FileVersion::V1,
            FormatRevision::PreReleaseV2 | FormatRevision::V2 => FileVersion::V2,
        }
    }

    pub fn is_pre_release(&self) -> bool {
        matches!(self, FormatRevision::PreReleaseV1(_) | FormatRevision::PreReleaseV2)
    }
}

impl TryFrom<u8> for FormatRevision {
    type Error = StackError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1..=7 => Ok(FormatRevision::PreReleaseV1(value)),
            8 => Ok(FormatRevision::V1),
            9 => Ok(FormatRevision::PreReleaseV2),
            10 => Ok(FormatRevision::V2),
            other => Err(StackError::NotRecognizedFormat(format!("unknown revision byte {}", other))),
        }
    }
}

// --- Geometry ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

/// A QuickDraw rectangle. `bottom` and `right` are exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rectangle {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
}

impl Rectangle {
    pub fn new(top: i32, left: i32, bottom: i32, right: i32) -> Self {
        Self { top, left, bottom, right }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// True when the rectangle encloses no pixel.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

// --- Stack header ---

/// Access level granted to the user when the stack opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UserLevel {
    Browse = 1,
    Type = 2,
    Paint = 3,
    Author = 4,
    Script = 5,
}

impl TryFrom<u16> for UserLevel {
    type Error = StackError;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            // Stacks that never had their level changed store 0.
            0 | 5 => Ok(UserLevel::Script),
            1 => Ok(UserLevel::Browse),
            2 => Ok(UserLevel::Type),
            3 => Ok(UserLevel::Paint),
            4 => Ok(UserLevel::Author),
            other => Err(StackError::Corrupted(format!("Invalid user level: {}", other))),
        }
    }
}

/// Protection flags from the word at 0x4C of the stack block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StackFlags {
    pub cant_peek: bool,
    pub cant_abort: bool,
    pub private_access: bool,
    pub cant_delete: bool,
    pub cant_modify: bool,
}

impl From<u16> for StackFlags {
    fn from(flags: u16) -> Self {
        Self {
            cant_peek: flags & (1 << 10) != 0,
            cant_abort: flags & (1 << 11) != 0,
            private_access: flags & (1 << 13) != 0,
            cant_delete: flags & (1 << 14) != 0,
            cant_modify: flags & (1 << 15) != 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseState {
    Development,
    Alpha,
    Beta,
    Final,
}

/// A HyperCard application version, as stamped in the stack header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppVersion {
    pub major: u8,
    pub minor1: u8,
    pub minor2: u8,
    pub state: ReleaseState,
    pub release: u8,
}

impl AppVersion {
    /// Decodes a version code in `NumVersion` layout; 0 means "never stamped".
    pub fn from_code(code: u32) -> Option<Self> {
        if code == 0 {
            return None;
        }
        let minor = (code >> 16) as u8;
        let state = match (code >> 8) as u8 {
            0x20 => ReleaseState::Development,
            0x40 => ReleaseState::Alpha,
            0x60 => ReleaseState::Beta,
            _ => ReleaseState::Final,
        };
        Some(Self {
            major: (code >> 24) as u8,
            minor1: minor >> 4,
            minor2: minor & 0xF,
            state,
            release: code as u8,
        })
    }
}

impl fmt::Display for AppVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor1)?;
        if self.minor2 != 0 {
            write!(f, ".{}", self.minor2)?;
        }
        match self.state {
            ReleaseState::Development => write!(f, "d{}", self.release),
            ReleaseState::Alpha => write!(f, "a{}", self.release),
            ReleaseState::Beta => write!(f, "b{}", self.release),
            ReleaseState::Final if self.release != 0 => write!(f, "f{}", self.release),
            ReleaseState::Final => Ok(()),
        }
    }
}

/// The four version stamps kept by HyperCard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VersionStamps {
    pub at_creation: Option<AppVersion>,
    pub at_last_compacting: Option<AppVersion>,
    pub at_last_modification_since_last_compacting: Option<AppVersion>,
    pub at_last_modification: Option<AppVersion>,
}

/// An unused area of the file, listed in the free block table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeLocation {
    pub offset: u32,
    pub size: u32,
}

/// An 8x8 fill pattern, one byte per row.
pub type Pattern = [u8; 8];

/// Decoded stack header (STAK block).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackHeader {
    pub revision: FormatRevision,
    pub total_size: u32,
    pub stack_size: u32,
    pub master_table_count: u32,
    pub background_count: u32,
    pub first_background_id: i32,
    pub card_count: u32,
    pub first_card_id: i32,
    pub list_id: i32,
    pub free_block_count: u32,
    pub free_size: u32,
    pub print_block_id: Option<i32>,
    pub password_hash: Option<u32>,
    pub user_level: UserLevel,
    pub flags: StackFlags,
    pub versions: VersionStamps,
    pub marked_card_count: u32,
    pub window_rectangle: Rectangle,
    pub screen_rectangle: Rectangle,
    pub scroll: Point,
    pub font_table_id: Option<i32>,
    pub style_table_id: Option<i32>,
    pub card_size: Size,
    pub patterns: Vec<Pattern>,
    pub free_locations: Vec<FreeLocation>,
    pub script: MacString,
    /// True if the header span was encrypted and had to be decoded.
    pub was_encrypted: bool,
}

impl StackHeader {
    pub fn version(&self) -> FileVersion {
        self.revision.version()
    }
}

// --- Text styles ---

/// QuickDraw text style bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TextStyle(pub u8);

impl TextStyle {
    pub const BOLD: u8 = 1 << 0;
    pub const ITALIC: u8 = 1 << 1;
    pub const UNDERLINE: u8 = 1 << 2;
    pub const OUTLINE: u8 = 1 << 3;
    pub const SHADOW: u8 = 1 << 4;
    pub const CONDENSE: u8 = 1 << 5;
    pub const EXTEND: u8 = 1 << 6;
    pub const GROUP: u8 = 1 << 7;

    pub fn plain() -> Self {
        TextStyle(0)
    }

    pub fn contains(&self, flag: u8) -> bool {
        self.0 & flag != 0
    }
}

/// Formatting attributes; `None` means "inherit from the part".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextFormatting {
    pub font_id: Option<i32>,
    pub size: Option<i32>,
    pub style: Option<TextStyle>,
}

/// One entry of the style table (STBL).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleEntry {
    pub number: i32,
    pub run_count: u32,
    pub formatting: TextFormatting,
}

/// One entry of the font table (FTBL).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontNameReference {
    pub identifier: i32,
    pub name: MacString,
}

// --- Card list ---

/// A LIST entry: one PAGE block and the number of cards it references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageReference {
    pub identifier: i32,
    pub card_count: usize,
}

/// Search hash words attached to a card reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHash {
    pub words: Vec<u32>,
    pub value_count: usize,
}

/// A PAGE entry: a card in stack order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardReference {
    pub identifier: i32,
    pub marked: bool,
    pub has_text_content: bool,
    pub is_start_of_background: bool,
    pub has_name: bool,
    pub search_hash: SearchHash,
}

// --- Layers, parts and contents ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerType {
    Card,
    Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Button,
    Field,
}

impl TryFrom<u8> for PartKind {
    type Error = StackError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(PartKind::Button),
            2 => Ok(PartKind::Field),
            other => Err(StackError::Corrupted(format!("Unknown part type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartStyle {
    Transparent,
    Opaque,
    Rectangle,
    RoundRect,
    Shadow,
    CheckBox,
    Radio,
    Scrolling,
    Standard,
    Default,
    Oval,
    Popup,
}

impl TryFrom<u8> for PartStyle {
    type Error = StackError;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            0 => PartStyle::Transparent,
            1 => PartStyle::Opaque,
            2 => PartStyle::Rectangle,
            3 => PartStyle::RoundRect,
            4 => PartStyle::Shadow,
            5 => PartStyle::CheckBox,
            6 => PartStyle::Radio,
            7 => PartStyle::Scrolling,
            8 => PartStyle::Standard,
            9 => PartStyle::Default,
            10 => PartStyle::Oval,
            11 => PartStyle::Popup,
            other => return Err(StackError::Corrupted(format!("Unknown part style: {}", other))),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

impl From<i16> for TextAlign {
    fn from(value: i16) -> Self {
        match value {
            1 => TextAlign::Center,
            -1 => TextAlign::Right,
            _ => TextAlign::Left,
        }
    }
}

/// A button or a field.
///
/// Several flag bits mean different things for buttons and fields; both readings are
/// exposed and the caller picks the one matching [`Part::kind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub identifier: i32,
    pub kind: PartKind,
    pub visible: bool,
    pub dont_wrap: bool,
    pub dont_search: bool,
    pub shared_text: bool,
    pub fixed_line_height: bool,
    pub auto_tab: bool,
    /// `lockText` for a field, `!enabled` for a button.
    pub lock_text_or_disabled: bool,
    pub rectangle: Rectangle,
    /// `showName` for a button, `autoSelect` for a field.
    pub show_name_or_auto_select: bool,
    /// `hilite` for a button, `showLines` for a field.
    pub highlight_or_show_lines: bool,
    /// `autoHilite` for a button, `wideMargins` for a field.
    pub auto_highlight_or_wide_margins: bool,
    /// `sharedHilite` for a button, `multipleLines` for a field.
    pub shared_highlight_or_multiple_lines: bool,
    pub family: u8,
    pub style: PartStyle,
    /// `titleWidth` for a button, `lastSelectedLine` for a field.
    pub title_width_or_last_selected_line: i32,
    /// `icon` for a button, `firstSelectedLine` for a field.
    pub icon_or_first_selected_line: i32,
    pub text_align: TextAlign,
    pub text_font_id: i32,
    pub text_size: i32,
    pub text_style: TextStyle,
    pub text_height: i32,
    pub name: MacString,
    pub script: MacString,
}

/// Which part a content record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentOwner {
    pub layer: LayerType,
    pub part_id: i32,
}

/// A style change inside formatted text, referring to a style table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormattingRun {
    pub offset: usize,
    pub style_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentText {
    Plain(MacString),
    Formatted {
        text: MacString,
        runs: Vec<FormattingRun>,
    },
}

impl ContentText {
    pub fn text(&self) -> &MacString {
        match self {
            ContentText::Plain(text) => text,
            ContentText::Formatted { text, .. } => text,
        }
    }
}

/// The text of a part (or a background field on one card).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartContent {
    pub owner: ContentOwner,
    pub text: ContentText,
}

/// What cards and backgrounds have in common.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerContents {
    pub bitmap_id: Option<i32>,
    pub cant_delete: bool,
    pub show_picture: bool,
    pub dont_search: bool,
    pub next_available_part_id: i32,
    pub parts: Vec<Part>,
    pub contents: Vec<PartContent>,
    pub name: MacString,
    pub script: MacString,
}

impl LayerContents {
    /// Content record of one of this layer's own parts.
    pub fn part_content(&self, owner: ContentOwner) -> Option<&PartContent> {
        self.contents.iter().find(|content| content.owner == owner)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub identifier: i32,
    pub page_id: i32,
    pub background_id: i32,
    pub marked: bool,
    pub layer: LayerContents,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Background {
    pub identifier: i32,
    pub card_count: u32,
    pub next_background_id: i32,
    pub previous_background_id: i32,
    pub layer: LayerContents,
}
