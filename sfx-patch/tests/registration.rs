//! End-to-end registration against a miniature decomp tree.

use std::path::{Path, PathBuf};

use serde_json::Value;
use sfx_patch::{
    Decomp, DurationProbe, Identifier, SfxError, SoundRegistration, Ticks, next_bank_id,
    register_sound,
};
use tempfile::{TempDir, tempdir};

const SOUNDS_H: &str = "\
#ifndef SOUNDS_H
#define SOUNDS_H

enum SoundBank {
    SOUND_BANK_ACTION,
    SOUND_BANK_MOVING,
    SOUND_BANK_GENERAL
    SOUND_BANK_COUNT
};

#define SOUND_ACTION_JUMP                                         SOUND_ARG_LOAD(SOUND_BANK_ACTION, 0x00, 0xFF, SOUND_DISCRETE)
#define SOUND_ACTION_LAND                                         SOUND_ARG_LOAD(SOUND_BANK_ACTION, 0x0A, 0xFF, SOUND_DISCRETE)
#define SOUND_GENERAL_COIN                                        SOUND_ARG_LOAD(SOUND_BANK_GENERAL, 0x11, 0x80, SOUND_DISCRETE)

#endif // SOUNDS_H
";

const SEQUENCES_JSON: &str = r#"{
    "00_sound_player": [
        "00",
        "01",
        "0A_custom"
    ],
    "01_cutscene_collect_star": [
        "0A"
    ]
}
"#;

const SOUND_PLAYER: &str = "\
.include \"seq_macros.inc\"
.section .rodata
.align 0

sequence_start:
seq_setmutebhv 0x60
seq_initchannels 0x3ff
seq_startchannel 0, .channel0
seq_startchannel 1, .channel1
seq_startchannel 2, .channel2
.main_loop_023589:
seq_delay 1
seq_jump .main_loop_023589

.channel0:
chan_setdyntable .channel0_table
chan_jump .main_loop_023589

.channel0_table:
sound_ref .sound_action_jump

.sound_action_jump:
chan_setbank 1
chan_setinstr 0
chan_setlayer 0, .layer_action_jump
chan_end

.layer_action_jump:
layer_note1 39, 0x30, 127
layer_end

.channel1:
chan_setdyntable .channel1_table
chan_jump .main_loop_023589

.channel1_table:

.channel2:
chan_setdyntable .channel2_table
chan_jump .main_loop_023589

.channel2_table:

.align 2, 0
";

const EXTERNAL_C: &str = "\
void process_sound_request(u32 bits, f32 *pos) {
    switch (bank) {
        case SOUND_BANK_ACTION:
            break;
        case SOUND_BANK_GENERAL:
            do_general();
            break;
    }
}

void update_game_sound(void) {
    switch (bank) {
        case SOUND_BANK_MOVING:
        case SOUND_BANK_GENERAL:
            do_general();
            break;
    }
}
";

/// Probe that reports a fixed duration without reading the file.
struct FixedProbe(f64);

impl DurationProbe for FixedProbe {
    fn probe(&self, _sample: &Path) -> sfx_patch::Result<f64> {
        Ok(self.0)
    }
}

struct Fixture {
    dir: TempDir,
    decomp: Decomp,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let write = |path: &str, content: &str| {
            let path = root.join(path);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        };

        write("sm64.ld", "");
        write("include/sounds.h", SOUNDS_H);
        write("sound/sequences.json", SEQUENCES_JSON);
        write("sound/sequences/00_sound_player.s", SOUND_PLAYER);
        write("src/audio/external.c", EXTERNAL_C);
        write("sound/sound_banks/00.json", "{}");
        write("sound/sound_banks/01.json", "{}");
        write("sound/sound_banks/0A_custom.json", "{}");
        write("bird.aiff", "FORM");
        write("monkey.aiff", "FORM");

        let decomp = Decomp::open(root).unwrap();
        Self { dir, decomp }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path(relative)).unwrap()
    }

    fn json(&self, relative: &str) -> Value {
        serde_json::from_str(&self.read(relative)).unwrap()
    }

    /// Every artifact the registration edits, for byte comparisons.
    fn snapshot(&self) -> Vec<String> {
        [
            "include/sounds.h",
            "sound/sequences.json",
            "sound/sequences/00_sound_player.s",
            "src/audio/external.c",
            "sound/sound_banks/02_JUNGLE.json",
        ]
        .iter()
        .map(|p| std::fs::read_to_string(self.path(p)).unwrap_or_default())
        .collect()
    }

    fn request(&self, sample: &str, bank: &str, sound: &str) -> SoundRegistration {
        SoundRegistration {
            sample: self.path(sample),
            bank: Identifier::parse(bank).unwrap(),
            sound: Identifier::parse(sound).unwrap(),
        }
    }

    fn register(&self, sample: &str, bank: &str, sound: &str) -> sfx_patch::Result<sfx_patch::RegistrationReport> {
        register_sound(&self.decomp, &self.request(sample, bank, sound), &FixedProbe(2.0))
    }
}

#[test]
fn test_new_bank_creates_everything() {
    let fx = Fixture::new();
    let report = fx.register("bird.aiff", "JUNGLE", "BIRD").unwrap();

    assert_eq!(report.bank_id, 0x02);
    assert_eq!(report.bank_hex(), "02");
    assert_eq!(report.duration, Ticks(0xC0));
    assert_eq!(report.bank_slot.ordinal, 3);
    assert!(report.bank_slot.inserted);
    assert_eq!(report.instrument.position, 0);
    assert!(report.instrument.created);
    assert!(report.sound_player.channel_added);
    assert_eq!(report.case_labels_added, 2);
    assert!(!report.is_duplicate());

    let header = fx.read("include/sounds.h");
    assert!(header.contains("    SOUND_BANK_GENERAL,\n    SOUND_BANK_JUNGLE,\n    SOUND_BANK_COUNT\n"));
    assert!(header.contains(
        "#define SOUND_JUNGLE_BIRD                                         SOUND_ARG_LOAD(SOUND_BANK_JUNGLE, 0x00, 0xFF, SOUND_DISCRETE)\n#endif"
    ));

    let descriptor = fx.json("sound/sound_banks/02_JUNGLE.json");
    assert_eq!(descriptor["sample_bank"], "sfx_jungle");
    assert_eq!(descriptor["instrument_list"], serde_json::json!(["inst_bird"]));
    assert_eq!(descriptor["instruments"]["inst_bird"]["sound"], "bird");

    let sequences = fx.json("sound/sequences.json");
    assert_eq!(
        sequences["00_sound_player"],
        serde_json::json!(["00", "01", "0A_custom", "02_JUNGLE"])
    );
    assert_eq!(sequences["01_cutscene_collect_star"], serde_json::json!(["0A"]));

    let player = fx.read("sound/sequences/00_sound_player.s");
    assert!(player.contains("seq_initchannels 0x1fff\n"));
    assert!(player.contains("seq_startchannel 2, .channel2\nseq_startchannel 3, .channel_JUNGLE\n"));
    assert!(player.contains(".channel_JUNGLE_table:\nsound_ref .sound_bird\n"));
    assert!(player.contains("chan_setbank 4\nchan_setinstr 0\n"));
    assert!(player.contains("layer_note1 39, 0xc0, 127\n"));
    assert!(player.ends_with("layer_end\n\n.align 2, 0\n"));

    let external = fx.read("src/audio/external.c");
    assert_eq!(external.matches("case SOUND_BANK_JUNGLE:").count(), 2);

    assert!(report.sample_copied);
    assert_eq!(
        std::fs::read(fx.path("sound/samples/sfx_jungle/bird.aiff")).unwrap(),
        b"FORM"
    );
}

#[test]
fn test_registering_twice_changes_nothing() {
    let fx = Fixture::new();
    fx.register("bird.aiff", "JUNGLE", "BIRD").unwrap();
    let before = fx.snapshot();

    let report = fx.register("bird.aiff", "JUNGLE", "BIRD").unwrap();
    assert!(report.is_duplicate());
    assert_eq!(report.bank_id, 0x02);
    assert_eq!(report.instrument.position, 0);
    assert_eq!(fx.snapshot(), before);
}

#[test]
fn test_second_sound_joins_existing_bank() {
    let fx = Fixture::new();
    fx.register("bird.aiff", "JUNGLE", "BIRD").unwrap();
    let report = fx.register("monkey.aiff", "JUNGLE", "MONKEY").unwrap();

    assert_eq!(report.bank_id, 0x02);
    assert!(!report.bank_slot.inserted);
    assert_eq!(report.sound_id, Some(0x01));
    assert_eq!(report.instrument.position, 1);
    assert!(!report.sound_player.channel_added);
    assert_eq!(report.case_labels_added, 0);
    assert!(!report.inclusion_added);

    let descriptor = fx.json("sound/sound_banks/02_JUNGLE.json");
    assert_eq!(
        descriptor["instrument_list"],
        serde_json::json!(["inst_bird", "inst_monkey"])
    );

    let header = fx.read("include/sounds.h");
    assert_eq!(header.matches("    SOUND_BANK_JUNGLE,").count(), 1);
    assert!(header.contains("SOUND_ARG_LOAD(SOUND_BANK_JUNGLE, 0x01, 0xFF, SOUND_DISCRETE)"));
    let bird = header.find("#define SOUND_JUNGLE_BIRD").unwrap();
    let monkey = header.find("#define SOUND_JUNGLE_MONKEY").unwrap();
    assert!(bird < monkey);

    let player = fx.read("sound/sequences/00_sound_player.s");
    assert!(player.contains("sound_ref .sound_bird\nsound_ref .sound_monkey\n"));
    assert!(player.contains("chan_setbank 4\nchan_setinstr 1\nchan_setlayer 0, .layer_monkey\n"));
    assert_eq!(player.matches(".channel_JUNGLE:").count(), 1);
    assert_eq!(player.matches("seq_startchannel").count(), 4);

    let external = fx.read("src/audio/external.c");
    assert_eq!(external.matches("case SOUND_BANK_JUNGLE:").count(), 2);
}

#[test]
fn test_exhausted_identifier_space_writes_nothing() {
    let fx = Fixture::new();
    for id in 0..=0xFFu8 {
        std::fs::write(fx.path(&format!("sound/sound_banks/{:02X}_full.json", id)), "{}").unwrap();
    }
    let before = fx.snapshot();

    let err = fx.register("bird.aiff", "JUNGLE", "BIRD").unwrap_err();
    assert!(matches!(err, SfxError::IdentifierSpaceExhausted));
    assert!(matches!(
        next_bank_id(&fx.decomp),
        Err(SfxError::IdentifierSpaceExhausted)
    ));
    assert_eq!(fx.snapshot(), before);
    assert!(!fx.path("sound/samples").exists());
}

#[test]
fn test_banks_get_distinct_ids() {
    let fx = Fixture::new();
    let jungle = fx.register("bird.aiff", "JUNGLE", "BIRD").unwrap();
    let desert = fx.register("monkey.aiff", "DESERT", "WIND").unwrap();

    assert_eq!(jungle.bank_id, 0x02);
    assert_eq!(desert.bank_id, 0x03);
    assert_eq!(desert.bank_slot.ordinal, 4);
    assert_eq!(next_bank_id(&fx.decomp).unwrap(), 0x04);

    let header = fx.read("include/sounds.h");
    assert!(header.contains("    SOUND_BANK_JUNGLE,\n    SOUND_BANK_DESERT,\n    SOUND_BANK_COUNT\n"));

    let player = fx.read("sound/sequences/00_sound_player.s");
    assert!(player.contains(
        "seq_startchannel 3, .channel_JUNGLE\nseq_startchannel 4, .channel_DESERT\n"
    ));
    assert!(player.contains("chan_setbank 5\n"));
    let jungle_block = player.find(".channel_JUNGLE:").unwrap();
    let desert_block = player.find(".channel_DESERT:").unwrap();
    assert!(jungle_block < desert_block);
    assert!(player.ends_with("layer_end\n\n.align 2, 0\n"));
}

#[test]
fn test_sound_in_vanilla_bank_uses_existing_channel() {
    let fx = Fixture::new();
    let report = fx.register("bird.aiff", "ACTION", "Flip").unwrap();

    assert_eq!(report.bank_slot.ordinal, 0);
    assert_eq!(report.sound_id, Some(0x0B));
    assert!(!report.sound_player.channel_added);
    assert_eq!(report.case_labels_added, 0);

    let header = fx.read("include/sounds.h");
    assert!(header.contains(
        "#define SOUND_ACTION_LAND                                         SOUND_ARG_LOAD(SOUND_BANK_ACTION, 0x0A, 0xFF, SOUND_DISCRETE)\n#define SOUND_ACTION_FLIP"
    ));

    let player = fx.read("sound/sequences/00_sound_player.s");
    assert!(player.contains("sound_ref .sound_action_jump\nsound_ref .sound_flip\n\n.sound_flip:\nchan_setbank 1\n"));
    assert_eq!(player.matches("seq_startchannel").count(), 3);
}

#[test]
fn test_missing_anchor_then_retry() {
    let fx = Fixture::new();
    std::fs::write(fx.path("src/audio/external.c"), "void f(void) {}\n").unwrap();

    let err = fx.register("bird.aiff", "JUNGLE", "BIRD").unwrap_err();
    match err {
        SfxError::MissingAnchor { anchor, .. } => assert_eq!(anchor, "case SOUND_BANK_GENERAL:"),
        other => panic!("unexpected error: {other:?}"),
    }
    // Earlier artifacts were already written
    assert!(fx.read("include/sounds.h").contains("SOUND_BANK_JUNGLE,"));
    assert_eq!(fx.read("src/audio/external.c"), "void f(void) {}\n");

    std::fs::write(fx.path("src/audio/external.c"), EXTERNAL_C).unwrap();
    let report = fx.register("bird.aiff", "JUNGLE", "BIRD").unwrap();
    assert_eq!(report.case_labels_added, 2);
    assert!(!report.bank_slot.inserted);
    assert!(!report.sound_player.changed());
    assert_eq!(fx.read("include/sounds.h").matches("SOUND_BANK_JUNGLE,").count(), 1);
}

#[test]
fn test_invalid_sample_is_rejected_before_any_write() {
    let fx = Fixture::new();
    std::fs::write(fx.path("bird.wav"), "RIFF").unwrap();
    let before = fx.snapshot();

    let err = fx.register("bird.wav", "JUNGLE", "BIRD").unwrap_err();
    assert!(matches!(err, SfxError::InvalidSampleFile { .. }));
    let err = fx.register("missing.aiff", "JUNGLE", "BIRD").unwrap_err();
    assert!(matches!(err, SfxError::InvalidSampleFile { .. }));
    assert_eq!(fx.snapshot(), before);
}

#[test]
fn test_bank_name_case_does_not_split_the_bank() {
    let fx = Fixture::new();
    let first = fx.register("bird.aiff", "jungle", "BIRD").unwrap();
    let second = fx.register("monkey.aiff", "JUNGLE", "MONKEY").unwrap();

    assert_eq!(first.bank_id, 0x02);
    assert_eq!(second.bank_id, 0x02);
    assert_eq!(second.descriptor, fx.path("sound/sound_banks/02_jungle.json"));
    assert_eq!(second.instrument.position, 1);
    assert!(!second.inclusion_added);
    assert!(!fx.path("sound/sound_banks/03_JUNGLE.json").exists());

    let descriptor = fx.json("sound/sound_banks/02_jungle.json");
    assert_eq!(
        descriptor["instrument_list"],
        serde_json::json!(["inst_bird", "inst_monkey"])
    );

    let sequences = fx.json("sound/sequences.json");
    assert_eq!(
        sequences["00_sound_player"],
        serde_json::json!(["00", "01", "0A_custom", "02_jungle"])
    );
    assert_eq!(next_bank_id(&fx.decomp).unwrap(), 0x03);
}

#[test]
fn test_sound_label_taken_by_another_bank_writes_nothing() {
    let fx = Fixture::new();
    fx.register("bird.aiff", "JUNGLE", "BIRD").unwrap();
    fx.register("monkey.aiff", "FOREST", "TREE").unwrap();
    let before = fx.snapshot();
    let forest = fx.read("sound/sound_banks/03_FOREST.json");

    let err = fx.register("bird.aiff", "FOREST", "BIRD").unwrap_err();
    match err {
        SfxError::SoundLabelConflict { label, .. } => assert_eq!(label, ".sound_bird"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fx.snapshot(), before);
    assert_eq!(fx.read("sound/sound_banks/03_FOREST.json"), forest);
    assert!(!fx.read("include/sounds.h").contains("SOUND_FOREST_BIRD"));
    assert!(!fx.path("sound/samples/sfx_forest/bird.aiff").exists());
}

#[test]
fn test_new_bank_reusing_a_sound_label_is_rejected() {
    let fx = Fixture::new();
    fx.register("bird.aiff", "JUNGLE", "BIRD").unwrap();
    let before = fx.snapshot();

    let err = fx.register("bird.aiff", "FOREST", "BIRD").unwrap_err();
    assert!(matches!(err, SfxError::SoundLabelConflict { .. }));
    assert_eq!(fx.snapshot(), before);
    assert!(!fx.read("include/sounds.h").contains("SOUND_BANK_FOREST"));
    assert!(!fx.path("sound/sound_banks/03_FOREST.json").exists());
}

#[test]
fn test_existing_sound_in_full_bank_is_a_duplicate() {
    let fx = Fixture::new();
    fx.register("bird.aiff", "JUNGLE", "BIRD").unwrap();
    let header = fx
        .read("include/sounds.h")
        .replace("SOUND_BANK_JUNGLE, 0x00,", "SOUND_BANK_JUNGLE, 0xFF,");
    std::fs::write(fx.path("include/sounds.h"), header).unwrap();
    let before = fx.snapshot();

    let report = fx.register("bird.aiff", "JUNGLE", "BIRD").unwrap();
    assert!(report.is_duplicate());
    assert_eq!(report.sound_id, None);
    assert_eq!(fx.snapshot(), before);

    let err = fx.register("monkey.aiff", "JUNGLE", "MONKEY").unwrap_err();
    assert!(matches!(err, SfxError::SoundIdSpaceExhausted { .. }));
}
