/// Turn-based game driven by the controller. Implementations are plain state
/// machines: `tick` must be deterministic for a given state and move.
pub trait GameEngine: Send + 'static {
    fn start(&mut self);
    /// Applies one turn. `None` means the round closed without a usable vote.
    fn tick(&mut self, game_move: Option<&str>);
    fn is_over(&self) -> bool;
    fn render(&self) -> String;
}

/// Builds fresh games for `GameController::new` and `GameController::restart`.
pub trait GameFactory: Send + Sync + 'static {
    type Game: GameEngine;

    fn create(&self) -> Self::Game;
}

impl<F, G> GameFactory for F
where
    F: Fn() -> G + Send + Sync + 'static,
    G: GameEngine,
{
    type Game = G;

    fn create(&self) -> G {
        self()
    }
}
