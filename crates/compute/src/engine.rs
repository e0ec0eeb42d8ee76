use std::time::Instant;

use tracing::{info, warn};

use review_core::{AnalysisResult, InputDocument};
use review_rules::Thresholds;

use crate::analyzer::Analyzer;
use crate::analyzers::{
    BehaviorAnalyzer, ConversionAnalyzer, PackageAnalyzer, PaymentOverviewAnalyzer,
    ReachAnalyzer, RTierAnalyzer, RewardAnalyzer,
};

/// Ordered registry of analyzers, run once per input document.
pub struct AnalysisEngine {
    analyzers: Vec<Box<dyn Analyzer>>,
}

impl AnalysisEngine {
    /// Empty engine; add analyzers with [`register`](Self::register).
    pub fn new() -> Self {
        Self {
            analyzers: Vec::new(),
        }
    }

    /// The seven analyzers in report order, graded against `thresholds`.
    pub fn standard(thresholds: &Thresholds) -> Self {
        let mut engine = Self::new();
        engine.register(Box::new(ReachAnalyzer::with_config(&thresholds.reach)));
        engine.register(Box::new(BehaviorAnalyzer::with_config(&thresholds.behavior)));
        engine.register(Box::new(PaymentOverviewAnalyzer::with_config(&thresholds.payment)));
        engine.register(Box::new(RTierAnalyzer::with_config(&thresholds.r_tier)));
        engine.register(Box::new(ConversionAnalyzer::with_config(&thresholds.conversion)));
        engine.register(Box::new(RewardAnalyzer::with_config(&thresholds.reward)));
        engine.register(Box::new(PackageAnalyzer::with_config(&thresholds.package)));
        engine
    }

    pub fn register(&mut self, analyzer: Box<dyn Analyzer>) {
        self.analyzers.push(analyzer);
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    /// Run every analyzer in registration order. Always returns one result per
    /// analyzer; a failing analyzer yields a degraded Watch result instead.
    pub fn run_all(&self, doc: &InputDocument) -> Vec<AnalysisResult> {
        let start = Instant::now();
        let mut results = Vec::with_capacity(self.analyzers.len());

        for analyzer in &self.analyzers {
            let module = analyzer.module();
            let module_start = Instant::now();
            let result = match analyzer.analyze(doc) {
                Ok(result) => result,
                Err(e) => {
                    warn!(
                        module = module.name(),
                        block = module.block(),
                        error = %e,
                        "analyzer degraded"
                    );
                    AnalysisResult::insufficient(module, format!("[{}] {e}", module.block()))
                }
            };
            info!(
                "  {} {} {} ({:.1}ms)",
                result.severity.marker(),
                module.name(),
                result.severity,
                module_start.elapsed().as_secs_f64() * 1000.0
            );
            results.push(result);
        }

        info!(
            "Analysis complete in {:.1}ms, {} modules",
            start.elapsed().as_secs_f64() * 1000.0,
            results.len()
        );
        results
    }
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::AnalyzeError;
    use crate::analyzers::tests::sample_document;
    use review_core::{Module, Severity};

    struct Failing;

    impl Analyzer for Failing {
        fn module(&self) -> Module {
            Module::Reward
        }

        fn analyze(&self, _doc: &InputDocument) -> Result<AnalysisResult, AnalyzeError> {
            Err(AnalyzeError::Computation("division by zero".into()))
        }
    }

    #[test]
    fn standard_engine_runs_in_report_order() {
        let engine = AnalysisEngine::standard(&Thresholds::default());
        assert_eq!(engine.len(), 7);
        let results = engine.run_all(&sample_document());
        let modules: Vec<Module> = results.iter().map(|r| r.module).collect();
        assert_eq!(modules, Module::ORDER.to_vec());
    }

    #[test]
    fn healthy_sample_is_normal_everywhere() {
        let results = AnalysisEngine::standard(&Thresholds::default()).run_all(&sample_document());
        for r in &results {
            assert_eq!(r.severity, Severity::Normal, "{}: {}", r.module_name, r.conclusion);
        }
    }

    #[test]
    fn failing_analyzer_degrades_to_watch() {
        let mut engine = AnalysisEngine::new();
        engine.register(Box::new(Failing));
        let results = engine.run_all(&sample_document());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].severity, Severity::Watch);
        assert_eq!(results[0].conclusion, "数值设计评估数据不足，跳过分析");
        assert_eq!(results[0].details[0], "[core_reward] computation failed: division by zero");
    }

    #[test]
    fn missing_behavior_block_degrades_only_that_module() {
        let mut doc = sample_document();
        doc.behavior_data = None;
        let results = AnalysisEngine::standard(&Thresholds::default()).run_all(&doc);
        assert_eq!(results[1].module, Module::Behavior);
        assert_eq!(results[1].severity, Severity::Watch);
        assert_eq!(
            results[1].details[0],
            "[behavior_data] insufficient data: behavior_data block is missing or empty"
        );
        assert_eq!(results[0].severity, Severity::Normal);
        assert_eq!(results.len(), 7);
    }
}
