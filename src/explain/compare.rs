/// Display names used in comparison text.
fn feature_display_name(name: &str) -> &str {
    match name {
        "Air temperature [K]" => "Air Temperature",
        "Process temperature [K]" => "Process Temperature",
        "Rotational speed [rpm]" => "Rotational Speed",
        "Torque [Nm]" => "Torque",
        "Tool wear [min]" => "Tool Wear",
        "Type_L" => "Equipment Type (Low)",
        "Type_M" => "Equipment Type (Medium)",
        other => other,
    }
}

/// Index of the largest-magnitude contribution; ties resolve to the first.
fn top_feature_index(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        let magnitude = v.abs();
        if !magnitude.is_finite() {
            return None;
        }
        match best {
            Some((_, current)) if magnitude <= current => {}
            _ => best = Some((i, magnitude)),
        }
    }
    best.map(|(i, _)| i)
}

/// Derive the natural-language comparison between the two models
///
/// The first point names the most influential feature per model and states
/// whether the models agree; the remaining two contrast how the model
/// families reason. Malformed attribution vectors produce a fixed two-line
/// fallback instead of an error.
pub fn comparison_points(
    gbdt_values: &[f64],
    linear_values: &[f64],
    feature_names: &[String],
) -> Vec<String> {
    let top = (|| {
        if gbdt_values.len() != feature_names.len()
            || linear_values.len() != feature_names.len()
            || feature_names.is_empty()
        {
            return None;
        }
        let gbdt_top = top_feature_index(gbdt_values)?;
        let linear_top = top_feature_index(linear_values)?;
        Some((gbdt_top, linear_top))
    })();

    let Some((gbdt_top, linear_top)) = top else {
        return vec![
            "-> Both models have been evaluated with the same input data.".to_string(),
            "-> XGBoost uses advanced pattern recognition, while Logistic Regression applies simpler mathematical rules.".to_string(),
        ];
    };

    let gbdt_display = feature_display_name(&feature_names[gbdt_top]);
    let linear_display = feature_display_name(&feature_names[linear_top]);

    let mut points = Vec::with_capacity(3);
    if gbdt_top == linear_top {
        points.push(format!(
            "-> **Agreement on Importance:** Both models agree that **{}** is the most important factor for this specific prediction.",
            gbdt_display
        ));
    } else {
        points.push(format!(
            "-> **Different Focus:** XGBoost's decision was most influenced by **{}**, while Logistic Regression focused more on **{}**.",
            gbdt_display, linear_display
        ));
    }

    points.push(
        "-> **How They 'Think':** Logistic Regression assumes a simple **linear** relationship (e.g., if more torque is bad, then even more torque is always worse). In contrast, the tree-based XGBoost can learn complex, non-linear rules (e.g., 'high torque is only a major risk *if* rotational speed is also low').".to_string(),
    );
    points.push(
        "-> **Complexity vs. Simplicity:** XGBoost is a more powerful model that can find intricate patterns, while Logistic Regression is simpler, faster, and easier to interpret.".to_string(),
    );

    points
}
