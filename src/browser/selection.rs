// ABOUTME: Selected key, scoped to the active connection
// ABOUTME: Switching connections clears the selection

#[derive(Debug, Default)]
pub struct BrowserSelection {
    context: Option<String>,
    selected: Option<String>,
}

impl BrowserSelection {
    pub fn new(context: Option<String>) -> Self {
        Self {
            context,
            selected: None,
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Returns true when the selection actually changed
    pub fn select(&mut self, key: Option<&str>) -> bool {
        if self.selected.as_deref() == key {
            return false;
        }
        self.selected = key.map(str::to_string);
        true
    }

    pub fn set_context(&mut self, context: Option<&str>) -> bool {
        if self.context.as_deref() == context {
            return false;
        }
        self.context = context.map(str::to_string);
        self.selected = None;
        true
    }
}
