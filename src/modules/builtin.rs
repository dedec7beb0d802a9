// src/modules/builtin.rs
use super::{AnalysisEntry, ControlSpec, DynamicModule, TableModelType};
use crate::data::ColumnType;
use crate::models::{ItemType, SourceSpec, TextType};

pub const COMMON: &str = "Common";
pub const SEM: &str = "SEM";
pub const SUMMARY_STATS: &str = "Summary Stats";
pub const NETWORK_ANALYSIS: &str = "Network Analysis";
pub const REINFORCEMENT_LEARNING: &str = "R11t Learn";

/// Name of the available-terms list every form fills from the data set.
pub const ALL_VARIABLES_LIST: &str = "allVariablesList";

fn entry(module: &str, group: &str, title: &str, function: &str, controls: Vec<ControlSpec>) -> AnalysisEntry {
    AnalysisEntry {
        module: module.to_string(),
        title: title.to_string(),
        function: function.to_string(),
        ribbon_group: group.to_string(),
        uses_jasp_results: true,
        controls,
    }
}

fn available(name: &str, sources: Vec<SourceSpec>, mixed: bool) -> ControlSpec {
    ControlSpec::AvailableTerms {
        name: name.to_string(),
        sources,
        mixed_model_terms: mixed,
    }
}

fn assigned(name: &str, source: &str, single_variable: bool) -> ControlSpec {
    ControlSpec::AssignedVariables {
        name: name.to_string(),
        source: source.to_string(),
        single_variable,
    }
}

fn text_area(name: &str, text_type: TextType) -> ControlSpec {
    ControlSpec::TextArea {
        name: name.to_string(),
        text_type,
    }
}

fn column_name(name: &str, computed: bool) -> ControlSpec {
    ControlSpec::ColumnName {
        name: name.to_string(),
        computed,
        column_type: ColumnType::Scale,
    }
}

fn module(name: &str, entries: Vec<AnalysisEntry>) -> DynamicModule {
    DynamicModule {
        name: name.to_string(),
        title: name.to_string(),
        help_folder: String::new(),
        entries,
        loaded: true,
    }
}

pub fn common() -> DynamicModule {
    let all_variables = || available(ALL_VARIABLES_LIST, vec![SourceSpec::new("allVariables")], false);

    module(COMMON, vec![
        entry(COMMON, "Frequencies", "Multinomial Test", "MultinomialTest", vec![
            all_variables(),
            assigned("factor", ALL_VARIABLES_LIST, true),
            ControlSpec::TableView {
                name: "priorCounts".to_string(),
                model_type: TableModelType::JagsDataInput,
                table_type: "PriorCounts".to_string(),
                item_type: ItemType::Double,
                initial_row_count: 0,
                initial_column_count: 0,
                sources: vec![SourceSpec::new("factor")],
            },
        ]),
        entry(COMMON, "Data", "Filtered Data Entry", "FilteredDataEntry", vec![
            all_variables(),
            assigned("dataColumns", ALL_VARIABLES_LIST, false),
            ControlSpec::TableView {
                name: "dataEntry".to_string(),
                model_type: TableModelType::FilteredDataEntry,
                table_type: String::new(),
                item_type: ItemType::Double,
                initial_row_count: 0,
                initial_column_count: 0,
                sources: vec![SourceSpec::new("dataColumns")],
            },
            column_name("saveEnteredAs", false),
        ]),
        entry(COMMON, "R", "R Code", "RCode", vec![text_area("code", TextType::Rcode)]),
    ])
}

pub fn sem() -> DynamicModule {
    module(SEM, vec![entry(SEM, "SEM", "Structural Equation Modeling", "SEMSimple", vec![
        available(ALL_VARIABLES_LIST, vec![SourceSpec::new("allVariables")], false),
        text_area("model", TextType::Lavaan),
        column_name("factorScoresColumn", true),
    ])])
}

pub fn summary_stats() -> DynamicModule {
    module(SUMMARY_STATS, vec![entry(SUMMARY_STATS, "T-Tests", "Bayesian Independent Samples T-Test", "SummaryStatsTTestBayesianIndependentSamples", vec![
        text_area("notes", TextType::Default),
    ])])
}

pub fn network_analysis() -> DynamicModule {
    module(NETWORK_ANALYSIS, vec![entry(NETWORK_ANALYSIS, "Network", "Network Analysis", "NetworkAnalysis", vec![
        available(ALL_VARIABLES_LIST, vec![SourceSpec::new("allVariables")], false),
        assigned("variables", ALL_VARIABLES_LIST, false),
        assigned("groupingVariable", ALL_VARIABLES_LIST, true),
        available(
            "interactions",
            vec![SourceSpec::new("variables"), SourceSpec::new("groupingVariable")],
            true,
        ),
    ])])
}

pub fn reinforcement_learning() -> DynamicModule {
    module(REINFORCEMENT_LEARNING, vec![entry(REINFORCEMENT_LEARNING, "Learning", "Reinforcement Learning", "ReinforcementLearning", vec![
        text_area("model", TextType::Model),
    ])])
}

pub fn all() -> Vec<DynamicModule> {
    vec![common(), sem(), summary_stats(), network_analysis(), reinforcement_learning()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_source_names_a_control_of_the_same_form() {
        for module in all() {
            for entry in &module.entries {
                let names: Vec<&str> = entry.controls.iter().map(ControlSpec::name).collect();
                for control in &entry.controls {
                    let sources: Vec<&str> = match control {
                        ControlSpec::TableView { sources, .. }
                        | ControlSpec::AvailableTerms { sources, .. } => {
                            sources.iter().map(|s| s.model.as_str()).collect()
                        }
                        ControlSpec::AssignedVariables { source, .. } => vec![source.as_str()],
                        ControlSpec::TextArea { .. } | ControlSpec::ColumnName { .. } => Vec::new(),
                    };
                    for source in sources {
                        assert!(
                            source == "allVariables" || names.contains(&source),
                            "{} in {} refers to unknown {}",
                            control.name(),
                            entry.title,
                            source
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn coded_references_are_unique() {
        let mut references: Vec<String> = all()
            .iter()
            .flat_map(|m| m.entries.iter().map(AnalysisEntry::coded_reference))
            .collect();
        let count = references.len();
        references.sort();
        references.dedup();
        assert_eq!(references.len(), count);
    }
}
