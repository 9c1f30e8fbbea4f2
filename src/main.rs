use actionbind::input::{
    Candidate, Category, ControlPath, ControlSampler, DeviceClass, DeviceHandle, DeviceKind,
    InputContext, PlayerId, PlayerInfo, PollEvent,
};
use actionbind::settings::Settings;
use anyhow::Result;
use log::info;

const KEYBOARD: DeviceHandle = DeviceHandle {
    id: 1,
    kind: DeviceKind::Keyboard,
};
const GAMEPAD: DeviceHandle = DeviceHandle {
    id: 2,
    kind: DeviceKind::Gamepad,
};

/// Scripted stand-in for the host's hardware polling
struct ScriptedPoller {
    frame: usize,
}

impl ControlSampler for ScriptedPoller {
    fn sample(&self, player: PlayerId, path: &ControlPath) -> f32 {
        let held = match (player, path.as_str()) {
            // Player 0 holds W for a few frames, taps Space, then taps E after the rebind
            (0, "<Keyboard>/w") => (1..4).contains(&self.frame),
            (0, "<Keyboard>/space") => (2..4).contains(&self.frame),
            (0, "<Keyboard>/e") => (7..9).contains(&self.frame),
            // Player 1 pushes the stick halfway right
            (1, "<Gamepad>/leftStick/right") => return if self.frame >= 2 { 0.6 } else { 0.0 },
            (1, "<Gamepad>/buttonSouth") => self.frame == 3,
            _ => false,
        };
        if held {
            1.0
        } else {
            0.0
        }
    }
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Starting actionbind demo...");

    let settings = Settings::load_default()?;
    let mut ctx = InputContext::new(settings);

    let registry = ctx.registry_mut();
    registry.register_value_action("Movement", "Move", Category::Movement)?;
    registry.register_button_action("Jump", "Jump", Category::Movement, true)?;
    registry.register_button_action("Interact", "Interact", Category::Interaction, true)?;
    registry.register_button_action("MenuTrigger", "Open Menu", Category::Menus, false)?;
    registry.set_binding("Movement", DeviceClass::Keyboard, "WASD")?;
    registry.set_binding("Movement", DeviceClass::Controller, "LeftStick")?;
    registry.set_binding("Jump", DeviceClass::Keyboard, "Space")?;
    registry.set_binding("Jump", DeviceClass::Controller, "A")?;
    registry.set_binding("MenuTrigger", DeviceClass::Keyboard, "Escape")?;

    for (category, actions) in ctx.actions_by_category(false) {
        info!("{}: {:?}", category, actions);
    }

    let roster = vec![
        PlayerInfo::new(0)
            .with_profile("Player One", true)
            .with_device(KEYBOARD),
        PlayerInfo::new(1)
            .with_profile("Guest", false)
            .with_device(GAMEPAD),
    ];

    for frame in 0..10 {
        let poller = ScriptedPoller { frame };
        ctx.tick(&roster, &poller, true);

        for player in [0, 1] {
            let jump = ctx.button_state(player, "Jump")?;
            let movement = ctx.value_state(player, "Movement")?;
            info!(
                "frame {} player {}: Jump={} Movement=({:.2}, {:.2})",
                frame, player, jump, movement.x, movement.y
            );
        }

        if frame == 4 {
            ctx.begin_rebind(0, "Jump")?;
            let captured = vec![
                Candidate::new(KEYBOARD, "<Keyboard>/w"),
                Candidate::new(KEYBOARD, "<Keyboard>/e"),
            ];
            for result in ctx.advance_rebind("Jump", &PollEvent::Candidates(captured))? {
                info!("Rebind: {:?}", result);
            }
        }
    }

    info!("Demo finished");
    Ok(())
}
