/// Which history entry has its rename/delete menu open, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MenuVisibility {
    open: Option<usize>,
    pointer_inside: bool,
}

impl MenuVisibility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `index`, closing any other menu. Toggling the open menu closes it.
    pub fn toggle(&mut self, index: usize) {
        self.open = if self.open == Some(index) {
            None
        } else {
            Some(index)
        };
    }

    pub fn close(&mut self) {
        self.open = None;
    }

    pub fn is_open(&self, index: usize) -> bool {
        self.open == Some(index)
    }

    pub fn any_open(&self) -> bool {
        self.open.is_some()
    }

    #[allow(dead_code)]
    pub fn open_index(&self) -> Option<usize> {
        self.open
    }

    /// Track whether the pointer is over the open menu or its trigger.
    pub fn set_pointer_inside(&mut self, inside: bool) {
        self.pointer_inside = inside;
    }

    /// A pointer press anywhere in the window. Closes the open menu unless
    /// the press landed on the menu or its trigger. Returns whether it closed.
    pub fn pointer_pressed(&mut self) -> bool {
        if self.open.is_some() && !self.pointer_inside {
            self.open = None;
            true
        } else {
            false
        }
    }

    /// Follow a new history entry being inserted at the front.
    pub fn on_prepended(&mut self) {
        self.open = self.open.map(|i| i + 1);
    }

    /// Follow the removal of history entry `removed`.
    pub fn on_removed(&mut self, removed: usize) {
        self.open = match self.open {
            Some(i) if i == removed => None,
            Some(i) if i > removed => Some(i - 1),
            other => other,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_opens_and_closes() {
        let mut menu = MenuVisibility::new();
        assert!(!menu.any_open());
        menu.toggle(2);
        assert!(menu.is_open(2));
        menu.toggle(2);
        assert!(!menu.any_open());
    }

    #[test]
    fn test_opening_another_closes_previous() {
        let mut menu = MenuVisibility::new();
        menu.toggle(0);
        menu.toggle(1);
        assert!(!menu.is_open(0));
        assert_eq!(menu.open_index(), Some(1));
    }

    #[test]
    fn test_close_is_unconditional() {
        let mut menu = MenuVisibility::new();
        menu.close();
        assert_eq!(menu.open_index(), None);
        menu.toggle(4);
        menu.close();
        assert_eq!(menu.open_index(), None);
    }

    #[test]
    fn test_press_outside_closes_menu() {
        let mut menu = MenuVisibility::new();
        menu.toggle(1);
        assert!(menu.pointer_pressed());
        assert!(!menu.any_open());
        assert!(!menu.pointer_pressed());
    }

    #[test]
    fn test_press_inside_keeps_menu() {
        let mut menu = MenuVisibility::new();
        menu.toggle(1);
        menu.set_pointer_inside(true);
        assert!(!menu.pointer_pressed());
        assert!(menu.is_open(1));

        menu.set_pointer_inside(false);
        assert!(menu.pointer_pressed());
        assert!(!menu.any_open());
    }

    #[test]
    fn test_prepend_shifts_open_menu() {
        let mut menu = MenuVisibility::new();
        menu.on_prepended();
        assert_eq!(menu.open_index(), None);
        menu.toggle(0);
        menu.on_prepended();
        assert_eq!(menu.open_index(), Some(1));
    }

    #[test]
    fn test_removal_reindexes() {
        let mut menu = MenuVisibility::new();
        menu.toggle(3);
        menu.on_removed(1);
        assert_eq!(menu.open_index(), Some(2));
        menu.on_removed(5);
        assert_eq!(menu.open_index(), Some(2));
        menu.on_removed(2);
        assert_eq!(menu.open_index(), None);
    }
}
