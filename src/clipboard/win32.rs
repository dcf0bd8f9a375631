//! Win32 viewer-chain listener running on its own message-loop thread

use std::cell::RefCell;
use std::sync::mpsc as std_mpsc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use windows::core::{w, Error as WinError};
use windows::Win32::Foundation::{SetLastError, HWND, LPARAM, LRESULT, WIN32_ERROR, WPARAM};
use windows::Win32::System::DataExchange::{ChangeClipboardChain, SetClipboardViewer};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW,
    GetWindowLongPtrW, PostMessageW, PostQuitMessage, RegisterClassW, SendMessageW,
    SetWindowLongPtrW, TranslateMessage, GWLP_USERDATA, HMENU, HWND_MESSAGE, MSG,
    WINDOW_EX_STYLE, WINDOW_STYLE, WM_CLOSE, WM_DESTROY, WNDCLASSW,
};

use crate::clipboard::bridge::{ClipboardBridge, ClipboardChanged, RawMessage, ViewerChain, WindowHandle};
use crate::clipboard::BridgeError;
use crate::core::models::MonitoringState;

type SharedBridge = RefCell<ClipboardBridge<Win32Chain>>;

/// `SetClipboardViewer` / `ChangeClipboardChain` / `SendMessageW`
pub(crate) struct Win32Chain;

impl ViewerChain for Win32Chain {
    fn register(&mut self, window: WindowHandle) -> Result<Option<WindowHandle>, BridgeError> {
        // a null return is also the "first viewer" case, so check the error code
        let next = unsafe {
            SetLastError(WIN32_ERROR(0));
            SetClipboardViewer(HWND(window))
        };
        if next.0 != 0 {
            return Ok(Some(next.0));
        }

        let err = WinError::from_win32();
        if err.code().is_err() {
            return Err(BridgeError::Registration(err.message().to_string()));
        }
        Ok(None)
    }

    fn unregister(&mut self, window: WindowHandle, next: Option<WindowHandle>) {
        let removed = unsafe { ChangeClipboardChain(HWND(window), HWND(next.unwrap_or(0))) };
        if !removed.as_bool() {
            warn!("ChangeClipboardChain failed: {}", WinError::from_win32());
        }
    }

    fn forward(&self, target: WindowHandle, message: &RawMessage) {
        unsafe {
            SendMessageW(
                HWND(target),
                message.id,
                WPARAM(message.wparam),
                LPARAM(message.lparam),
            );
        }
    }
}

unsafe extern "system" fn listener_wndproc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let bridge = GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *const SharedBridge;

    if !bridge.is_null() {
        // SAFETY: set by `run_listener` and cleared before the box is freed
        let bridge = &*bridge;

        if msg == WM_DESTROY {
            if let Ok(mut bridge) = bridge.try_borrow_mut() {
                bridge.dispose();
            }
            PostQuitMessage(0);
            return LRESULT(0);
        }

        // busy while joining the chain; let the default handler take it
        if let Ok(mut bridge) = bridge.try_borrow_mut() {
            let message = RawMessage {
                id: msg,
                wparam: wparam.0,
                lparam: lparam.0,
            };
            if bridge.handle_message(&message) {
                return LRESULT(0);
            }
        }
    }

    DefWindowProcW(hwnd, msg, wparam, lparam)
}

/// Create the message-only window, join the chain and pump messages until WM_CLOSE
pub(crate) fn run_listener(
    monitoring: MonitoringState,
    sender: mpsc::Sender<ClipboardChanged>,
    ready: std_mpsc::Sender<Result<WindowHandle, BridgeError>>,
) {
    let hwnd = match create_window() {
        Ok(hwnd) => hwnd,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let bridge: *mut SharedBridge = Box::into_raw(Box::new(RefCell::new(ClipboardBridge::new(
        Win32Chain,
        monitoring,
        sender,
    ))));

    unsafe {
        SetWindowLongPtrW(hwnd, GWLP_USERDATA, bridge as isize);
    }

    // SAFETY: `bridge` stays valid until it is reclaimed below
    let initialized = unsafe { (*bridge).borrow_mut().initialize(hwnd.0) };

    match initialized {
        Ok(()) => {
            let _ = ready.send(Ok(hwnd.0));
            pump_messages();
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            unsafe {
                let _ = DestroyWindow(hwnd);
            }
        }
    }

    unsafe {
        SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
        drop(Box::from_raw(bridge));
    }
    debug!("Clipboard listener thread finished");
}

fn create_window() -> Result<HWND, BridgeError> {
    let class_name = w!("ClipboardTranslatorListener");

    unsafe {
        let instance =
            GetModuleHandleW(None).map_err(|e| BridgeError::Registration(e.message().to_string()))?;

        let wc = WNDCLASSW {
            lpfnWndProc: Some(listener_wndproc),
            hInstance: instance.into(),
            lpszClassName: class_name,
            ..Default::default()
        };
        // fails harmlessly when the class already exists
        RegisterClassW(&wc);

        let hwnd = CreateWindowExW(
            WINDOW_EX_STYLE::default(),
            class_name,
            w!("Clipboard Translator"),
            WINDOW_STYLE::default(),
            0,
            0,
            0,
            0,
            HWND_MESSAGE,
            HMENU::default(),
            instance,
            None,
        );

        if hwnd.0 == 0 {
            return Err(BridgeError::Registration(WinError::from_win32().message().to_string()));
        }
        Ok(hwnd)
    }
}

fn pump_messages() {
    let mut msg = MSG::default();
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).into() {
            TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

/// Ask the listener window to close; its thread leaves the chain and exits
pub(crate) fn post_close(window: WindowHandle) {
    unsafe {
        let _ = PostMessageW(HWND(window), WM_CLOSE, WPARAM(0), LPARAM(0));
    }
}
