//! Native field kind + flags → normalized field type

use form_types::FieldType;

/// Field type as declared by `/FT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeKind {
    Text,
    Button,
    Choice,
    Signature,
}

impl NativeKind {
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"Tx" => Some(NativeKind::Text),
            b"Btn" => Some(NativeKind::Button),
            b"Ch" => Some(NativeKind::Choice),
            b"Sig" => Some(NativeKind::Signature),
            _ => None,
        }
    }
}

/// Field flags (`/Ff`), bit positions are 1-based in the PDF reference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldFlags(pub u32);

impl FieldFlags {
    pub const MULTILINE: u32 = 1 << 12;
    pub const RADIO: u32 = 1 << 15;
    pub const PUSHBUTTON: u32 = 1 << 16;
    pub const COMBO: u32 = 1 << 17;
    pub const MULTI_SELECT: u32 = 1 << 21;

    pub fn contains(&self, flag: u32) -> bool {
        self.0 & flag != 0
    }
}

/// Map a native kind and its flags to the closed field type set.
///
/// Buttons with both the radio and pushbutton flags set are ambiguous and
/// classify as checkboxes. Choice fields are `Select` whether they are
/// combo boxes or (multi-select) list boxes.
pub fn classify(kind: NativeKind, flags: FieldFlags) -> FieldType {
    match kind {
        NativeKind::Text if flags.contains(FieldFlags::MULTILINE) => FieldType::Textarea,
        NativeKind::Text => FieldType::Text,
        NativeKind::Button => {
            match (
                flags.contains(FieldFlags::RADIO),
                flags.contains(FieldFlags::PUSHBUTTON),
            ) {
                (true, false) => FieldType::RadioButton,
                (false, true) => FieldType::Button,
                (false, false) | (true, true) => FieldType::Checkbox,
            }
        }
        NativeKind::Choice => FieldType::Select,
        NativeKind::Signature => FieldType::Signature,
    }
}
