//! Run-configuration ordering and launch planning.

use serde::Serialize;

use crate::config::RunConfiguration;
use crate::projects::Worktree;

use super::types::NewSession;

/// Which runners a launch starts. Unselected runners are still created,
/// deferred, so they show up as idle tabs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerSelection {
    /// The default group (`auto_start`).
    Defaults,
    Named(String),
    All,
}

impl RunnerSelection {
    pub fn selects(&self, config: &RunConfiguration) -> bool {
        match self {
            RunnerSelection::Defaults => config.auto_start,
            RunnerSelection::Named(name) => &config.name == name,
            RunnerSelection::All => true,
        }
    }
}

/// A runner session to ensure exists, and whether to start it.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerPlan {
    pub new: NewSession,
    pub start: bool,
}

/// Default group first, then optional; each by `order` then name.
pub fn ordered(configs: &[RunConfiguration]) -> Vec<&RunConfiguration> {
    let mut ordered: Vec<&RunConfiguration> = configs.iter().collect();
    ordered.sort_by(|a, b| {
        b.auto_start
            .cmp(&a.auto_start)
            .then(a.order.cmp(&b.order))
            .then_with(|| a.name.cmp(&b.name))
    });
    ordered
}

/// Plan runner sessions for `worktree` in display order.
pub fn plan_launch(
    worktree: &Worktree,
    configs: &[RunConfiguration],
    selection: &RunnerSelection,
) -> Vec<RunnerPlan> {
    ordered(configs)
        .into_iter()
        .map(|config| {
            let start = selection.selects(config);
            let mut new = NewSession::runner(
                &worktree.id,
                &config.name,
                config.command.clone(),
                worktree.path.clone(),
            )
            .deferred(!start);
            if let Some(port) = config.port {
                new = new.with_env("PORT", port.to_string());
            }
            RunnerPlan { new, start }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configs() -> Vec<RunConfiguration> {
        vec![
            RunConfiguration::new("storybook", "npm run storybook").with_order(1),
            RunConfiguration::new("web", "npm run dev")
                .with_auto_start(true)
                .with_order(2)
                .with_port(3000),
            RunConfiguration::new("api", "cargo run")
                .with_auto_start(true)
                .with_order(1)
                .with_port(8080),
            RunConfiguration::new("docs", "mdbook serve").with_order(1),
        ]
    }

    fn names(configs: &[&RunConfiguration]) -> Vec<String> {
        configs.iter().map(|c| c.name.clone()).collect()
    }

    #[test]
    fn test_default_group_first_then_order_then_name() {
        let configs = configs();
        assert_eq!(
            names(&ordered(&configs)),
            vec!["api", "web", "docs", "storybook"]
        );
    }

    #[test]
    fn test_plan_defaults_starts_only_auto_start() {
        let worktree = Worktree::new("app/feat", "/src/app-feat", "feat");
        let plans = plan_launch(&worktree, &configs(), &RunnerSelection::Defaults);

        let started: Vec<_> = plans
            .iter()
            .filter(|p| p.start)
            .map(|p| p.new.title.clone().unwrap())
            .collect();
        assert_eq!(started, vec!["api", "web"]);
        assert!(plans.iter().all(|p| p.new.defer_execution != p.start));
    }

    #[test]
    fn test_plan_named_selects_single_runner() {
        let worktree = Worktree::new("app/feat", "/src/app-feat", "feat");
        let plans = plan_launch(
            &worktree,
            &configs(),
            &RunnerSelection::Named("docs".to_string()),
        );
        let started: Vec<_> = plans.iter().filter(|p| p.start).collect();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].new.command.as_deref(), Some("mdbook serve"));
        assert_eq!(plans.len(), 4);
    }

    #[test]
    fn test_configured_port_is_exported() {
        let worktree = Worktree::new("app/feat", "/src/app-feat", "feat");
        let plans = plan_launch(&worktree, &configs(), &RunnerSelection::All);
        let web = plans
            .iter()
            .find(|p| p.new.title.as_deref() == Some("web"))
            .unwrap();
        assert!(web.new.env.contains(&("PORT".to_string(), "3000".to_string())));
        assert_eq!(web.new.working_dir, worktree.path);
    }
}
