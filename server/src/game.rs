use rand::Rng;
use shared::{
    check_paddle_hit, BallState, PlayerState, GAME_HEIGHT, GAME_WIDTH, LEFT_PADDLE_REACH,
    MAX_ANGLE, MAX_PLAYERS,
};

/// Advances the ball by one tick against the two paddles (join order).
///
/// Everything except the restart after a point is deterministic.
pub fn advance<R: Rng + ?Sized>(
    ball: &BallState,
    players: &[PlayerState; MAX_PLAYERS],
    rng: &mut R,
) -> BallState {
    let mut next = *ball;
    let height = GAME_HEIGHT as f64;
    let width = GAME_WIDTH as f64;

    next.x += next.speed_x;
    next.y += next.speed_y;

    if next.y - next.radius <= 0.0 {
        next.y = next.radius;
        next.speed_y = -next.speed_y;
    }

    if next.y + next.radius >= height {
        next.y = height - next.radius;
        next.speed_y = -next.speed_y;
    }

    // Only the velocity flips; the ball may sit inside a paddle for a frame.
    let [left, right] = players;
    if check_paddle_hit(&next, left, LEFT_PADDLE_REACH) {
        next.speed_x = -next.speed_x;
    }
    if check_paddle_hit(&next, right, 0) {
        next.speed_x = -next.speed_x;
    }

    if next.x - next.radius <= 0.0 || next.x + next.radius >= width {
        restart_ball(&mut next, rng);
    }

    next
}

/// Puts the ball back in the middle with a fresh launch direction.
///
/// The vertical component follows the drawn angle, the horizontal direction
/// is a separate coin flip.
pub fn restart_ball<R: Rng + ?Sized>(ball: &mut BallState, rng: &mut R) {
    ball.x = GAME_WIDTH as f64 / 2.0;
    ball.y = GAME_HEIGHT as f64 / 2.0;

    let degrees = rng.gen_range(-MAX_ANGLE..=MAX_ANGLE);
    ball.angle = (degrees as f64).to_radians();
    ball.speed_x = ball.velocity * ball.angle.cos();
    ball.speed_y = ball.velocity * ball.angle.sin();

    if rng.gen_bool(0.5) {
        ball.speed_x = ball.speed_x.abs();
    } else {
        ball.speed_x = -ball.speed_x.abs();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::{MID_COORD, START_POSITIONS};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn moving_ball(x: f64, y: f64, speed_x: f64, speed_y: f64) -> BallState {
        BallState {
            x,
            y,
            speed_x,
            speed_y,
            ..BallState::centered()
        }
    }

    #[test]
    fn test_free_flight() {
        let ball = moving_ball(400.0, 200.0, 3.0, -4.0);
        let next = advance(&ball, &START_POSITIONS, &mut rng());

        assert_approx_eq!(next.x, 403.0);
        assert_approx_eq!(next.y, 196.0);
        assert_eq!(next.speed_x, 3.0);
        assert_eq!(next.speed_y, -4.0);
    }

    #[test]
    fn test_advance_leaves_input_untouched() {
        let ball = moving_ball(400.0, 200.0, 3.0, -4.0);
        let _ = advance(&ball, &START_POSITIONS, &mut rng());
        assert_eq!(ball.x, 400.0);
    }

    #[test]
    fn test_top_wall_bounce_at_radius() {
        // Already touching the wall and still heading into it.
        let ball = moving_ball(400.0, 15.0, 0.0, -5.0);
        let next = advance(&ball, &START_POSITIONS, &mut rng());

        assert_eq!(next.y, next.radius);
        assert!(next.speed_y > 0.0);
    }

    #[test]
    fn test_bottom_wall_bounce() {
        let ball = moving_ball(400.0, 700.0, 2.0, 8.0);
        let next = advance(&ball, &START_POSITIONS, &mut rng());

        assert_eq!(next.y, GAME_HEIGHT as f64 - next.radius);
        assert_eq!(next.speed_y, -8.0);
        assert_approx_eq!(next.x, 402.0);
    }

    #[test]
    fn test_left_paddle_bounce() {
        let ball = moving_ball(52.0, (MID_COORD + 50) as f64, -10.0, 0.0);
        let next = advance(&ball, &START_POSITIONS, &mut rng());

        assert_approx_eq!(next.x, 42.0);
        assert_eq!(next.speed_x, 10.0);
    }

    #[test]
    fn test_right_paddle_bounce() {
        let ball = moving_ball(1240.0, (MID_COORD + 50) as f64, 10.0, 0.0);
        let next = advance(&ball, &START_POSITIONS, &mut rng());

        assert_approx_eq!(next.x, 1250.0);
        assert_eq!(next.speed_x, -10.0);
    }

    #[test]
    fn test_paddle_miss_keeps_direction() {
        // Same depth as the bounce above, but far below the paddle.
        let ball = moving_ball(52.0, 600.0, -10.0, 0.0);
        let next = advance(&ball, &START_POSITIONS, &mut rng());

        assert_eq!(next.speed_x, -10.0);
    }

    #[test]
    fn test_score_on_left_edge_restarts() {
        let ball = moving_ball(20.0, 600.0, -10.0, 0.0);
        let next = advance(&ball, &START_POSITIONS, &mut rng());

        assert_eq!(next.x, 640.0);
        assert_eq!(next.y, 360.0);
        assert_approx_eq!(next.speed(), next.velocity, 1e-9);
    }

    #[test]
    fn test_score_on_right_edge_restarts() {
        let ball = moving_ball(1262.0, 100.0, 10.0, 0.0);
        let next = advance(&ball, &START_POSITIONS, &mut rng());

        assert_eq!(next.x, 640.0);
        assert_eq!(next.y, 360.0);
    }

    #[test]
    fn test_restart_ball_preserves_speed() {
        let mut rng = rng();
        let mut ball = moving_ball(12.0, 40.0, -10.0, 0.0);

        for _ in 0..500 {
            restart_ball(&mut ball, &mut rng);

            assert_eq!(ball.x, GAME_WIDTH as f64 / 2.0);
            assert_eq!(ball.y, GAME_HEIGHT as f64 / 2.0);
            assert_approx_eq!(
                ball.speed_x * ball.speed_x + ball.speed_y * ball.speed_y,
                ball.velocity * ball.velocity,
                1e-9
            );
            assert!(ball.angle.abs() <= (MAX_ANGLE as f64).to_radians() + 1e-12);
        }
    }

    #[test]
    fn test_restart_ball_picks_both_directions() {
        let mut rng = rng();
        let mut ball = BallState::centered();
        let mut left = 0;
        let mut right = 0;

        for _ in 0..200 {
            restart_ball(&mut ball, &mut rng);
            if ball.speed_x < 0.0 {
                left += 1;
            } else {
                right += 1;
            }
        }

        assert!(left > 0);
        assert!(right > 0);
    }
}
