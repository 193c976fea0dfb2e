// Widget registry - immutable catalog of widget templates
use crate::domain::errors::{DashboardError, DashboardResult};
use crate::domain::widget::{CategoryFilter, WidgetTemplate};
use crate::infrastructure::config::WidgetsConfig;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct WidgetRegistry {
    templates: Vec<WidgetTemplate>,
    index: HashMap<String, usize>,
}

impl WidgetRegistry {
    /// Build a registry, rejecting duplicate ids and default sizes that do
    /// not fit a grid of `columns` columns.
    pub fn new(templates: Vec<WidgetTemplate>, columns: u32) -> DashboardResult<Self> {
        let mut index = HashMap::with_capacity(templates.len());

        for (i, template) in templates.iter().enumerate() {
            let size = template.default_size;
            if size.width == 0 || size.height == 0 || size.width > columns {
                return Err(DashboardError::validation(format!(
                    "template {} has default size {}x{} which does not fit a {}-column grid",
                    template.template_id, size.width, size.height, columns
                )));
            }
            if index.insert(template.template_id.clone(), i).is_some() {
                return Err(DashboardError::validation(format!(
                    "duplicate template id: {}",
                    template.template_id
                )));
            }
        }

        Ok(Self { templates, index })
    }

    pub fn from_config(config: WidgetsConfig, columns: u32) -> DashboardResult<Self> {
        let templates = config.templates.into_iter().map(WidgetTemplate::from).collect();
        Self::new(templates, columns)
    }

    pub fn get_template(&self, template_id: &str) -> DashboardResult<&WidgetTemplate> {
        self.index
            .get(template_id)
            .map(|&i| &self.templates[i])
            .ok_or_else(|| DashboardError::TemplateNotFound(template_id.to_string()))
    }

    /// Templates in declaration order, optionally narrowed to one category.
    pub fn list_by_category(&self, filter: CategoryFilter) -> Vec<(&str, &WidgetTemplate)> {
        self.templates
            .iter()
            .filter(|t| match filter {
                CategoryFilter::All => true,
                CategoryFilter::Only(category) => t.category == category,
            })
            .map(|t| (t.template_id.as_str(), t))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn test_registry() -> std::sync::Arc<WidgetRegistry> {
    let config = crate::infrastructure::config::builtin_widgets_config().unwrap();
    std::sync::Arc::new(WidgetRegistry::from_config(config, 12).unwrap())
}
