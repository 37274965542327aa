use std::io::Write;

use log::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::script::Step;
use crate::store::{Connector, Session, Store};

/// Connects once and executes a script step by step, stopping at the first
/// failure. The connection is released on every exit path.
pub struct Runner {
    config: Config,
    steps: Vec<Step>,
}

impl Runner {
    pub fn new(config: Config, steps: Vec<Step>) -> Self {
        Self { config, steps }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Runs the script, writing one status line per step to `out`.
    pub async fn run<C, W>(&self, connector: &C, out: &mut W) -> Result<()>
    where
        C: Connector,
        W: Write,
    {
        let store = connector.connect(&self.config).await.map_err(|err| {
            debug!("Could not connect to {}: {}", self.config, err);
            Error::Connection(err)
        })?;

        let mut session = Session::new(store);
        let result = self.execute(&mut session, out).await;
        session.close();
        result
    }

    async fn execute<S, W>(&self, session: &mut Session<S>, out: &mut W) -> Result<()>
    where
        S: Store,
        W: Write,
    {
        for (n, step) in self.steps.iter().enumerate() {
            debug!("Step {}: {:?}", n + 1, step.op);

            let outcome = match session.store() {
                Ok(store) => step.op.apply(store).await,
                Err(err) => Err(err),
            };
            let outcome = outcome.map_err(|source| {
                debug!("Step {} failed while {}: {}", n + 1, step.action, source);
                Error::Command {
                    step: step.action.clone(),
                    source,
                }
            })?;

            writeln!(out, "{}: {}", step.caption, outcome)?;
        }

        info!("Completed {} steps", self.steps.len());
        writeln!(out, "Operations completed successfully!")?;
        Ok(())
    }
}
