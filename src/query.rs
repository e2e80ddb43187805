use scraper::{ElementRef, Html, Selector};

/// Read-only CSS querying over a parsed page or a subtree of it.
///
/// Extractors only depend on this trait, so they work the same on a whole
/// document and on a single element.
pub trait DocumentQuery {
    fn select_all(&self, selector: &Selector) -> Vec<ElementRef<'_>>;

    fn select_first(&self, selector: &Selector) -> Option<ElementRef<'_>> {
        self.select_all(selector).into_iter().next()
    }
}

impl DocumentQuery for Html {
    fn select_all(&self, selector: &Selector) -> Vec<ElementRef<'_>> {
        self.select(selector).collect()
    }

    fn select_first(&self, selector: &Selector) -> Option<ElementRef<'_>> {
        self.select(selector).next()
    }
}

impl DocumentQuery for ElementRef<'_> {
    fn select_all(&self, selector: &Selector) -> Vec<ElementRef<'_>> {
        self.select(selector).collect()
    }

    fn select_first(&self, selector: &Selector) -> Option<ElementRef<'_>> {
        self.select(selector).next()
    }
}

/// Concatenated text of all descendants.
pub fn inner_text(element: ElementRef) -> String {
    element.text().collect()
}
