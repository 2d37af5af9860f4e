use std::sync::Arc;

use crate::config::Config;
use crate::error::AppResult;
use crate::picker::{PickerManager, PickerOptions};
use crate::roster::{DirectoryClient, RosterFetcher, RosterState};

use super::state::AppState;

pub struct RosterSubsystem {
    pub state: RosterState,
    pub fetcher: RosterFetcher,
}

pub struct InteractionSubsystem {
    pub picker: PickerManager,
}

pub struct App {
    pub state: AppState,
    pub roster: RosterSubsystem,
    pub interaction: InteractionSubsystem,
    pub config: Config,
}

impl App {
    pub fn new(client: Arc<dyn DirectoryClient>, options: PickerOptions) -> AppResult<Self> {
        let config = Config::load()?;
        Ok(Self::new_with_config(client, options, config))
    }

    pub fn new_with_config(
        client: Arc<dyn DirectoryClient>,
        options: PickerOptions,
        config: Config,
    ) -> Self {
        let state = AppState {
            selection: options.current.clone(),
            ..AppState::default()
        };

        Self {
            state,
            roster: RosterSubsystem {
                state: RosterState::default(),
                fetcher: RosterFetcher::new(client),
            },
            interaction: InteractionSubsystem {
                picker: PickerManager::new(options),
            },
            config,
        }
    }
}
