//! Per-screen notification queue and stacking layout.

use crate::{
    LayoutSettings, NotificationId, Popup, PopupFactory, QueueError, ScreenDirectory, ScreenId,
};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// Whether a notification currently occupies a slot on its screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Queued but not mapped, waiting for room on its screen.
    Pending,
    /// Mapped at its computed position.
    Visible,
}

/// A live notification.
#[derive(Debug)]
pub struct Notification<P> {
    id: NotificationId,
    screen: ScreenId,
    visibility: Visibility,
    popup: P,
}

impl<P: Popup> Notification<P> {
    pub fn id(&self) -> NotificationId {
        self.id
    }

    /// The screen the notification was opened on. Never changes afterwards.
    pub fn screen(&self) -> ScreenId {
        self.screen
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_visible(&self) -> bool {
        self.visibility == Visibility::Visible
    }

    pub fn popup(&self) -> &P {
        &self.popup
    }
}

/// Owns every live notification and keeps each screen's layout consistent.
///
/// Notifications live in an id-keyed arena; each screen holds the ids of its
/// notifications in arrival order. The layout of a screen is recomputed after
/// every insertion or removal on that screen.
pub struct NotificationQueue<S, F: PopupFactory> {
    screens: S,
    factory: F,
    settings: LayoutSettings,
    notifications: HashMap<NotificationId, Notification<F::Popup>>,
    order: Vec<Vec<NotificationId>>,
    /// `None` once every id has been handed out.
    next_id: Option<NotificationId>,
}

impl<S: ScreenDirectory, F: PopupFactory> NotificationQueue<S, F> {
    /// Create an empty queue with one list per screen reported by `screens`.
    pub fn new(screens: S, factory: F, settings: LayoutSettings) -> Self {
        let count = screens.screen_count().max(1) as usize;
        debug!("Notification queue tracking {} screen(s)", count);
        Self {
            screens,
            factory,
            settings,
            notifications: HashMap::new(),
            order: vec![Vec::new(); count],
            next_id: Some(0),
        }
    }

    /// Open a notification on the focused screen and lay that screen out again.
    ///
    /// On failure nothing is added and no id is consumed.
    pub fn open(&mut self, level: &str, text: &str) -> Result<NotificationId, QueueError> {
        let id = self.next_id.ok_or(QueueError::IdsExhausted)?;
        let screen = self.focused_screen();

        let popup = self
            .factory
            .open(level, self.settings.title.as_deref(), text)?;

        self.next_id = id.checked_add(1);
        self.notifications.insert(
            id,
            Notification {
                id,
                screen,
                visibility: Visibility::Pending,
                popup,
            },
        );
        self.order[screen as usize].push(id);
        debug!("Opened notification {} on screen {} ({})", id, screen, level);

        self.recompute_layout(screen);
        Ok(id)
    }

    /// Close one notification and lay its screen out again.
    pub fn close(&mut self, id: NotificationId) -> Result<(), QueueError> {
        let notification = self
            .notifications
            .remove(&id)
            .ok_or(QueueError::NotFound(id))?;
        let screen = notification.screen;

        self.order[screen as usize].retain(|&other| other != id);
        notification.popup.close();
        debug!("Closed notification {} on screen {}", id, screen);

        self.recompute_layout(screen);
        Ok(())
    }

    /// Close the oldest notification on `screen`.
    pub fn close_top(&mut self, screen: ScreenId) -> Result<NotificationId, QueueError> {
        let id = self
            .order
            .get(screen as usize)
            .and_then(|ids| ids.first().copied())
            .ok_or(QueueError::EmptyScreen(screen))?;
        self.close(id)?;
        Ok(id)
    }

    /// Close every notification on every screen. No layout is recomputed.
    pub fn close_all(&mut self) {
        let mut closed = 0usize;
        for ids in &mut self.order {
            for id in ids.drain(..) {
                if let Some(notification) = self.notifications.remove(&id) {
                    notification.popup.close();
                    closed += 1;
                }
            }
        }
        debug!("Closed all notifications ({})", closed);
    }

    /// Redraw every visible notification, screen by screen in list order.
    pub fn redraw_all(&mut self) {
        for ids in &self.order {
            for id in ids {
                if let Some(notification) = self.notifications.get_mut(id) {
                    if notification.is_visible() {
                        notification.popup.redraw();
                    }
                }
            }
        }
    }

    /// Look a notification up by id.
    pub fn find_by_id(&self, id: NotificationId) -> Option<&Notification<F::Popup>> {
        self.notifications.get(&id)
    }

    /// Ids on `screen`, oldest first. Unknown screens have none.
    pub fn screen_ids(&self, screen: ScreenId) -> &[NotificationId] {
        self.order
            .get(screen as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// The focused screen, clamped to a screen this queue tracks.
    pub fn focused_screen(&self) -> ScreenId {
        let screen = self.screens.focused_screen();
        if (screen as usize) < self.order.len() {
            screen
        } else {
            warn!("Focused screen {} is out of range, using screen 0", screen);
            0
        }
    }

    /// Stack the notifications of `screen` from its gravity edge.
    ///
    /// A notification is placed while its bottom plus the spacing still fits
    /// inside the screen height. Every later one stays or becomes pending.
    fn recompute_layout(&mut self, screen: ScreenId) {
        let geometry = match self.screens.geometry(screen) {
            Ok(g) => g,
            Err(e) => {
                warn!("Cannot lay out screen {}: {}", screen, e);
                return;
            }
        };
        let gravity = self.settings.gravity;
        let padding = self.settings.padding;
        let Some(ids) = self.order.get(screen as usize) else {
            return;
        };

        let mut cursor = padding.space;
        let mut shown = 0usize;
        for id in ids {
            let Some(notification) = self.notifications.get_mut(id) else {
                continue;
            };
            let popup = &mut notification.popup;
            let height = popup.height();
            let next = cursor.saturating_add(padding.space).saturating_add(height);

            if cursor < geometry.height && next <= geometry.height {
                let (x, y) = gravity.place(&geometry, padding, cursor, popup.width(), height);
                popup.move_to(x, y);
                if notification.visibility == Visibility::Pending {
                    popup.map();
                    notification.visibility = Visibility::Visible;
                }
                shown += 1;
            } else if notification.visibility == Visibility::Visible {
                popup.unmap();
                notification.visibility = Visibility::Pending;
            }
            cursor = next;
        }

        trace!(
            "Screen {} layout: {} of {} visible",
            screen,
            shown,
            ids.len()
        );
    }
}
