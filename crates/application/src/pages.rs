use inkfolio_core::{BookText, ImageDescriptor, Page, PageContent, PageKind, PageLink};

/// Index of the first gallery page when the gallery is not empty.
const FIRST_GALLERY_PAGE: usize = 2;

/// Cover, the index page, one page per image, the contact page, and a
/// trailing blank page when that leaves the count odd.
///
/// The index page faces the cover: the newest piece (the first image) and a
/// link to every gallery page. It is left out for an empty gallery.
pub fn build_pages(book: &BookText, images: &[ImageDescriptor]) -> Vec<Page> {
    let mut contents = Vec::with_capacity(images.len() + 4);

    let mut cover_body = vec![book.subtitle.clone(), String::new()];
    cover_body.extend(book.welcome.iter().cloned());
    if !book.instruction.is_empty() {
        cover_body.push(String::new());
        cover_body.push(book.instruction.clone());
    }
    contents.push((
        PageKind::Cover,
        PageContent {
            heading: book.title.clone(),
            body: cover_body,
            image: None,
            links: Vec::new(),
        },
    ));

    if let Some(newest) = images.first() {
        contents.push((
            PageKind::Index,
            PageContent {
                heading: book.showpiece.clone(),
                body: vec![newest.display_name.clone(), book.collection.clone()],
                image: Some(newest.clone()),
                links: images
                    .iter()
                    .enumerate()
                    .map(|(i, image)| PageLink {
                        label: image.display_name.clone(),
                        page: FIRST_GALLERY_PAGE + i,
                    })
                    .collect(),
            },
        ));
    }

    for image in images {
        contents.push((
            PageKind::Gallery,
            PageContent {
                heading: image.display_name.clone(),
                body: Vec::new(),
                image: Some(image.clone()),
                links: Vec::new(),
            },
        ));
    }

    if let Some((heading, body)) = book.contact.split_first() {
        contents.push((
            PageKind::Contact,
            PageContent {
                heading: heading.clone(),
                body: body.to_vec(),
                image: None,
                links: Vec::new(),
            },
        ));
    }

    let mut pages: Vec<Page> = contents
        .into_iter()
        .enumerate()
        .map(|(index, (kind, content))| Page {
            index,
            kind,
            content,
        })
        .collect();

    if pages.len() % 2 != 0 {
        pages.push(Page::blank(pages.len()));
    }

    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn image(n: usize) -> ImageDescriptor {
        ImageDescriptor {
            filename: format!("{n}_piece.png"),
            display_name: format!("Piece {n}"),
            path: format!("/images/{n}_piece.png"),
        }
    }

    #[test]
    fn cover_index_gallery_contact_in_order() {
        let pages = build_pages(&BookText::default(), &[image(1), image(2)]);
        let kinds: Vec<_> = pages.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PageKind::Cover,
                PageKind::Index,
                PageKind::Gallery,
                PageKind::Gallery,
                PageKind::Contact,
                PageKind::Blank,
            ]
        );
        assert_eq!(pages[0].content.heading, "Ink Stories");
        assert_eq!(pages[2].content.image, Some(image(1)));
        assert_eq!(pages[4].content.heading, "Get in touch");
    }

    #[test]
    fn index_page_shows_newest_and_links_every_piece() {
        let pages = build_pages(&BookText::default(), &[image(7), image(8), image(9)]);
        let index = &pages[1].content;
        assert_eq!(index.heading, "Most Recent Showpiece");
        assert_eq!(index.image, Some(image(7)));
        assert_eq!(index.body[0], "Piece 7");
        let targets: Vec<_> = index.links.iter().map(|l| (l.label.as_str(), l.page)).collect();
        assert_eq!(targets, vec![("Piece 7", 2), ("Piece 8", 3), ("Piece 9", 4)]);
        for link in &index.links {
            let target = pages[link.page].content.image.as_ref().unwrap();
            assert_eq!(target.display_name, link.label);
        }
    }

    #[test]
    fn empty_gallery_has_no_index_page() {
        let pages = build_pages(&BookText::default(), &[]);
        assert!(pages.iter().all(|p| p.kind != PageKind::Index));
        assert_eq!(pages[1].kind, PageKind::Contact);
    }

    #[test]
    fn odd_collection_gets_blank_page() {
        let pages = build_pages(&BookText::default(), &[image(1), image(2)]);
        assert_eq!(pages.len(), 6);
        assert!(pages[5].is_blank());
        assert_eq!(pages[5].index, 5);
    }

    #[test]
    fn no_contact_page_without_contact_lines() {
        let book = BookText {
            contact: Vec::new(),
            ..BookText::default()
        };
        let pages = build_pages(&book, &[image(1), image(2)]);
        assert_eq!(pages.len(), 4);
        assert!(pages.iter().all(|p| p.kind != PageKind::Contact));
    }

    #[test]
    fn indices_are_sequential() {
        let pages = build_pages(&BookText::default(), &[image(1), image(2), image(3)]);
        for (i, page) in pages.iter().enumerate() {
            assert_eq!(page.index, i);
        }
    }

    proptest! {
        #[test]
        fn page_count_is_always_even(count in 0usize..64, with_contact in any::<bool>()) {
            let book = BookText {
                contact: if with_contact { vec!["Contact".to_string()] } else { Vec::new() },
                ..BookText::default()
            };
            let images: Vec<_> = (0..count).map(image).collect();
            let pages = build_pages(&book, &images);
            prop_assert_eq!(pages.len() % 2, 0);
            prop_assert!(pages.len() >= count + 1);
            if let Some(index) = pages.iter().find(|p| p.kind == PageKind::Index) {
                for link in &index.content.links {
                    prop_assert_eq!(pages[link.page].kind, PageKind::Gallery);
                }
            }
        }
    }
}
