use super::*;
use crate::animation::keyframe::Interp;
use crate::animation::model::AnimationSettings;
use crate::foundation::core::FrameRange;

fn ctx(opts: EditorOpts) -> EditorContext {
    let settings = AnimationSettings {
        range: FrameRange::new(FrameIndex(5), FrameIndex(100)).unwrap(),
        ..AnimationSettings::default()
    };
    EditorContext::new(Animation::new("edit", settings).unwrap(), opts)
}

#[test]
fn cursor_starts_at_range_start_and_steps() {
    let mut c = ctx(EditorOpts::default());
    assert_eq!(c.current_frame(), FrameIndex(5));
    assert_eq!(c.next_frame(false), FrameIndex(6));
    assert_eq!(c.next_frame(true), FrameIndex(16));
    assert_eq!(c.prev_frame(true), FrameIndex(6));
    assert_eq!(c.prev_frame(false), FrameIndex(5));
}

#[test]
fn unkeyed_edit_is_an_override_until_cursor_moves() {
    let mut c = ctx(EditorOpts::default());
    c.set_channel_value(Channel::Fov, 60.0).unwrap();
    assert_eq!(c.channel_value(Channel::Fov), 60.0);
    assert!(c.has_override(Channel::Fov));
    assert!(!c.history().can_undo());

    c.next_frame(false);
    assert_eq!(c.channel_value(Channel::Fov), 90.0);
    assert!(!c.has_override(Channel::Fov));
}

#[test]
fn keying_uses_override_then_base_values() {
    let mut c = ctx(EditorOpts::default());
    c.set_channel_value(Channel::PosZ, 250.0).unwrap();
    assert!(c.set_keyframe(AttributeId::All).unwrap());
    assert!(c.has_keyframe(AttributeId::All));
    assert!(!c.has_override(Channel::PosZ));

    let a = c.animation();
    let at = |ch: Channel| a.curve(ch).keyframe_at(FrameIndex(5)).unwrap();
    assert_eq!(at(Channel::PosZ).value, 250.0);
    assert_eq!(at(Channel::Fov).value, 90.0);
    assert_eq!(at(Channel::Aperture).value, 2.8);
    assert_eq!(at(Channel::RotYaw).interp, Interp::Smooth);

    assert!(!c.set_keyframe(AttributeId::Position).unwrap());
    assert_eq!(c.history().undo_len(), 1);
}

#[test]
fn keyed_edit_updates_key_and_is_undoable() {
    let mut c = ctx(EditorOpts::default());
    c.set_keyframe(AttributeId::Fov).unwrap();
    c.set_channel_value(Channel::Fov, 45.0).unwrap();
    assert_eq!(c.channel_value(Channel::Fov), 45.0);
    assert_eq!(c.history().undo_len(), 2);

    assert!(c.undo().unwrap());
    assert_eq!(c.channel_value(Channel::Fov), 90.0);
    assert!(c.redo().unwrap());
    assert_eq!(c.channel_value(Channel::Fov), 45.0);
}

#[test]
fn auto_keyframe_creates_keys() {
    let mut c = ctx(EditorOpts {
        auto_keyframe: true,
        default_interp: Interp::Linear,
        ..EditorOpts::default()
    });
    c.set_channel_value(Channel::RotPitch, -15.0).unwrap();
    let key = *c
        .animation()
        .curve(Channel::RotPitch)
        .keyframe_at(FrameIndex(5))
        .unwrap();
    assert_eq!(key.value, -15.0);
    assert_eq!(key.interp, Interp::Linear);
    assert!(!c.has_override(Channel::RotPitch));
}

#[test]
fn toggle_keys_then_clears_and_undo_restores_cursor() {
    let mut c = ctx(EditorOpts::default());
    c.set_current_frame(FrameIndex(20));
    assert!(c.toggle_keyframe(AttributeId::Rotation).unwrap());
    assert!(c.has_keyframe(AttributeId::Rotation));

    c.set_current_frame(FrameIndex(40));
    assert!(c.undo().unwrap());
    assert_eq!(c.current_frame(), FrameIndex(20));
    assert!(!c.has_keyframe(AttributeId::Rotation));

    c.set_current_frame(FrameIndex(60));
    assert!(c.redo().unwrap());
    assert_eq!(c.current_frame(), FrameIndex(20));
    assert!(c.has_keyframe(AttributeId::Rotation));

    assert!(c.toggle_keyframe(AttributeId::Rotation).unwrap());
    assert!(!c.has_keyframe(AttributeId::Rotation));
    assert!(c.animation().curve(Channel::RotYaw).is_empty());
}

#[test]
fn toggle_on_partially_keyed_attribute_completes_it() {
    let mut c = ctx(EditorOpts::default());
    c.set_keyframe(AttributeId::Fov).unwrap();
    assert!(!c.has_keyframe(AttributeId::All));
    c.toggle_keyframe(AttributeId::All).unwrap();
    assert!(c.has_keyframe(AttributeId::All));
}

#[test]
fn locked_channel_blocks_group_edit() {
    let mut c = ctx(EditorOpts::default());
    c.set_channel_locked(Channel::PosY, true);
    assert!(c.toggle_keyframe(AttributeId::Position).is_err());
    for ch in AttributeId::Position.channels() {
        assert!(c.animation().curve(*ch).is_empty());
    }
    assert!(!c.history().can_undo());
}

#[test]
fn jump_between_keyframes() {
    let mut c = ctx(EditorOpts::default());
    for f in [10, 30] {
        c.set_current_frame(FrameIndex(f));
        c.set_keyframe(AttributeId::Aperture).unwrap();
    }
    c.set_current_frame(FrameIndex(20));
    assert_eq!(c.jump_to_next_keyframe(AttributeId::All), Some(FrameIndex(30)));
    assert_eq!(c.jump_to_next_keyframe(AttributeId::All), None);
    assert_eq!(c.current_frame(), FrameIndex(30));
    assert_eq!(c.jump_to_prev_keyframe(AttributeId::Aperture), Some(FrameIndex(10)));
    assert_eq!(c.jump_to_prev_keyframe(AttributeId::Fov), None);
}

#[test]
fn history_limit_comes_from_options() {
    let mut c = ctx(EditorOpts {
        history_limit: Some(1),
        ..EditorOpts::default()
    });
    c.set_keyframe(AttributeId::Fov).unwrap();
    c.set_keyframe(AttributeId::Aperture).unwrap();
    assert!(c.undo().unwrap());
    assert!(!c.undo().unwrap());
    assert!(c.has_keyframe(AttributeId::Fov));
    assert!(!c.has_keyframe(AttributeId::Aperture));
}

#[test]
fn auto_keyframe_toggles_during_session() {
    let mut c = ctx(EditorOpts::default());
    assert!(!c.auto_keyframe());
    c.set_channel_value(Channel::PosX, 1.0).unwrap();
    assert!(c.has_override(Channel::PosX));

    assert!(c.toggle_auto_keyframe());
    c.set_channel_value(Channel::PosX, 2.0).unwrap();
    assert_eq!(
        c.animation()
            .curve(Channel::PosX)
            .keyframe_at(FrameIndex(5))
            .unwrap()
            .value,
        2.0
    );
    assert!(!c.has_override(Channel::PosX));

    c.set_auto_keyframe(false);
    assert!(!c.opts().auto_keyframe);
    c.set_channel_value(Channel::PosY, 4.0).unwrap();
    assert!(c.animation().curve(Channel::PosY).is_empty());
}

#[test]
fn clear_keyframe_removes_keys_at_cursor() {
    let mut c = ctx(EditorOpts::default());
    c.set_current_frame(FrameIndex(12));
    c.set_keyframe(AttributeId::Position).unwrap();
    assert!(c.clear_keyframe(AttributeId::Position).unwrap());
    assert!(!c.has_keyframe(AttributeId::Position));
    assert!(!c.clear_keyframe(AttributeId::Position).unwrap());
    assert!(c.undo().unwrap());
    assert!(c.has_keyframe(AttributeId::Position));
}
