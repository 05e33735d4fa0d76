use color_eyre::eyre::{
    Report,
    Result,
    eyre,
};
use std::str::FromStr;

/// Commands the panel's widgets raise.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PanelCommand {
    SelectSlot(usize),
    DoneSelectingItems,
    PlaceStamp,
    SendEnvelope,
    NextItem,
    Dismiss,
    Cancel,
}

impl FromStr for PanelCommand {
    type Err = Report;

    fn from_str(token: &str) -> Result<Self> {
        let token = token.trim().to_ascii_lowercase();
        let command = match token.as_str() {
            "doneselectingitems" => PanelCommand::DoneSelectingItems,
            "placestamp" => PanelCommand::PlaceStamp,
            "envelopesend" => PanelCommand::SendEnvelope,
            "nextitem" => PanelCommand::NextItem,
            "dismiss" => PanelCommand::Dismiss,
            "cancel" => PanelCommand::Cancel,
            other => {
                let slot = other
                    .strip_prefix("select")
                    .ok_or_else(|| eyre!("Unknown panel command: {other}"))?;
                let slot = slot
                    .parse::<usize>()
                    .map_err(|_| eyre!("Invalid slot in panel command: {other}"))?;
                PanelCommand::SelectSlot(slot)
            }
        };
        Ok(command)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AnimationSequence {
    Intro,
    OkBlink,
    LetterStart,
    PlaceStamp,
    LetterSend,
    WaitForItemsOnly,
    ItemReceived,
}

impl AnimationSequence {
    /// Name of the sequence in the panel's animation script.
    pub fn script_name(self) -> &'static str {
        match self {
            AnimationSequence::Intro => "CollectionCrafting_Intro",
            AnimationSequence::OkBlink => "CollectionCrafting_OKBlink",
            AnimationSequence::LetterStart => "CollectionCrafting_LetterStart",
            AnimationSequence::PlaceStamp => "CollectionCrafting_PlaceStamp",
            AnimationSequence::LetterSend => "CollectionCrafting_LetterSend",
            AnimationSequence::WaitForItemsOnly => "CollectionCrafting_WaitForItemsOnly",
            AnimationSequence::ItemReceived => "CollectionCrafting_ItemReceived",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Sound {
    PanelSlide,
    ApplySticker,
}

impl Sound {
    pub fn path(self) -> &'static str {
        match self {
            Sound::PanelSlide => "ui/trade_up_panel_slide.wav",
            Sound::ApplySticker => "ui/trade_up_apply_sticker.wav",
        }
    }
}

/// Cues for the presentation layer, drained after every call into the panel.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Feedback {
    Animation(AnimationSequence),
    Sound(Sound),
    ItemRevealed { item_id: u64, more_pending: bool },
    Closed,
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn from_str__parses_known_tokens() {
        assert_eq!(
            "envelopesend".parse::<PanelCommand>().unwrap(),
            PanelCommand::SendEnvelope
        );
        assert_eq!(
            "NextItem".parse::<PanelCommand>().unwrap(),
            PanelCommand::NextItem
        );
        assert_eq!(
            "select3".parse::<PanelCommand>().unwrap(),
            PanelCommand::SelectSlot(3)
        );
    }

    #[test]
    fn from_str__rejects_unknown_tokens() {
        assert!("reloadscheme".parse::<PanelCommand>().is_err());
        assert!("selectx".parse::<PanelCommand>().is_err());
        assert!("select".parse::<PanelCommand>().is_err());
    }
}
