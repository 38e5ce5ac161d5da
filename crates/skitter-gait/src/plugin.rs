//! Bevy ECS plugin for the stepping gait.
//!
//! Provides [`SkitterGaitPlugin`], which runs one [`Body::frame`] per app
//! update using the frame's delta time.
//!
//! Insert a [`LocomotionBody`] and a [`GroundResource`] after assembling the
//! body; write [`MotionInput`] from your input layer and read
//! [`LastFrameReport`] for diagnostics.

use bevy::prelude::*;

use skitter_core::ground::GroundQuery;
use skitter_core::types::MotionCommand;

use crate::body::{Body, FrameReport};

/// Bevy plugin for the stepping gait.
pub struct SkitterGaitPlugin;

impl Plugin for SkitterGaitPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MotionInput>()
            .init_resource::<LastFrameReport>()
            .add_systems(Update, locomotion_system);
    }
}

/// The body driven by the plugin.
#[derive(Resource, Debug)]
pub struct LocomotionBody(pub Body);

/// Motion command applied on the next frame.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct MotionInput(pub MotionCommand);

/// Ground the legs sense and land on.
#[derive(Resource)]
pub struct GroundResource(pub Box<dyn GroundQuery + Send + Sync>);

impl GroundResource {
    pub fn new(ground: impl GroundQuery + Send + Sync + 'static) -> Self {
        Self(Box::new(ground))
    }
}

/// Report of the most recent frame.
#[derive(Resource, Debug, Clone, Default)]
pub struct LastFrameReport(pub Option<FrameReport>);

/// Runs one body frame. Does nothing until both the body and the ground
/// resources exist.
#[allow(clippy::needless_pass_by_value)]
fn locomotion_system(
    time: Res<Time>,
    input: Res<MotionInput>,
    ground: Option<Res<GroundResource>>,
    body: Option<ResMut<LocomotionBody>>,
    mut last: ResMut<LastFrameReport>,
) {
    let (Some(ground), Some(mut body)) = (ground, body) else {
        return;
    };
    let report = body.0.frame(&input.0, time.delta_secs(), ground.0.as_ref());
    last.0 = Some(report);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use skitter_core::config::LocomotionConfig;
    use skitter_core::ground::FlatGround;

    use crate::layout::HexapodLayout;

    fn app_with_body() -> App {
        let ground = FlatGround::new(0.0);
        let body = HexapodLayout::default()
            .assemble(LocomotionConfig::default(), &ground)
            .unwrap();

        let mut app = App::new();
        app.init_resource::<Time>();
        app.add_plugins(SkitterGaitPlugin);
        app.insert_resource(LocomotionBody(body));
        app.insert_resource(GroundResource::new(ground));
        app
    }

    #[test]
    fn plugin_registers_resources() {
        let mut app = App::new();
        app.init_resource::<Time>();
        app.add_plugins(SkitterGaitPlugin);
        app.update();
        assert!(app.world().contains_resource::<MotionInput>());
        assert!(app.world().resource::<LastFrameReport>().0.is_none());
    }

    #[test]
    fn system_runs_one_frame_per_update() {
        let mut app = app_with_body();
        app.update();
        app.update();
        let body = &app.world().resource::<LocomotionBody>().0;
        assert_eq!(body.frame_count(), 2);
        let report = app.world().resource::<LastFrameReport>().0.as_ref().unwrap();
        assert_eq!(report.frame, 2);
    }

    #[test]
    fn motion_input_moves_body() {
        let mut app = app_with_body();
        app.insert_resource(MotionInput(MotionCommand::forward(1.0)));
        for _ in 0..10 {
            app.world_mut()
                .resource_mut::<Time>()
                .advance_by(Duration::from_millis(16));
            app.update();
        }
        let body = &app.world().resource::<LocomotionBody>().0;
        assert!(body.pose().position.x > 1.0);
    }
}
