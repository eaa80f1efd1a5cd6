//! Solidity ABI bindings for the gateway and the Safe / ERC-4337 contracts.
//!
//! Field order of `BuyIntent` is part of the gateway wire contract and must not change.

use alloy_sol_types::sol;

sol! {
    /// Buy intent tuple accepted by `IIntentGateway.submitIntent`.
    #[sol(all_derives)]
    #[derive(Debug, PartialEq, Eq)]
    struct BuyIntent {
        uint64 sourceChainSelector;
        address memeToken;
        uint256 amountOut;
        uint256 maxEthIn;
        uint256 maxSlippageBps;
        uint64 helperSelector;
        uint256 deadline;
        bytes32 nonce;
    }

    #[sol(all_derives)]
    interface IIntentGateway {
        function submitIntent(BuyIntent intent) external payable returns (bytes32 intentId);
    }

    interface ISafe {
        function setup(
            address[] calldata _owners,
            uint256 _threshold,
            address to,
            bytes calldata data,
            address fallbackHandler,
            address paymentToken,
            uint256 payment,
            address paymentReceiver
        ) external;
    }

    interface ISafeModuleSetup {
        function enableModules(address[] calldata modules) external;
    }

    interface IMultiSend {
        function multiSend(bytes memory transactions) external payable;
    }

    interface ISafeProxyFactory {
        function proxyCreationCode() external pure returns (bytes memory);
        function createProxyWithNonce(address _singleton, bytes memory initializer, uint256 saltNonce)
            external
            returns (address proxy);
    }

    #[sol(all_derives)]
    interface ISafe4337Module {
        function executeUserOp(address to, uint256 value, bytes calldata data, uint8 operation) external;
    }

    interface IEntryPoint {
        function getNonce(address sender, uint192 key) external view returns (uint256 nonce);
    }
}
